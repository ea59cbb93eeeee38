use base64::Engine;
use rand::RngCore;
use std::fmt;

/// トークン生成に使う乱数のバイト数（256ビット）
const TOKEN_BYTES: usize = 32;

/// 予約確認トークン
/// 予約作成時に一度だけ生成され、確認メールのリンクに埋め込まれる
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConfirmationToken(String);

impl ConfirmationToken {
    /// 暗号学的に安全な乱数から新しいトークンを生成
    /// URLセーフなbase64（パディングなし、43文字）で表現する
    pub fn generate() -> Self {
        let mut random_bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut random_bytes);
        Self(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes))
    }

    /// 永続化済みの値からトークンを復元
    pub fn from_string(value: String) -> Self {
        Self(value)
    }

    /// トークン文字列を取得
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 提示されたトークンが一致するか定数時間で比較する
    pub fn matches(&self, candidate: &str) -> bool {
        constant_time_eq::constant_time_eq(self.0.as_bytes(), candidate.as_bytes())
    }
}

// トークンはログに出さない
impl fmt::Debug for ConfirmationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConfirmationToken(***)")
    }
}
