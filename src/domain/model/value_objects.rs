use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

// UUIDをラップする識別子型を定義する
macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// 新しい一意の識別子を生成
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// UUIDから識別子を作成
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// 文字列から識別子を作成
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                let uuid = Uuid::parse_str(s)?;
                Ok(Self(uuid))
            }

            /// 内部のUUIDを取得
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

uuid_identifier!(
    /// 予約の一意識別子
    BookingId
);
uuid_identifier!(
    /// 開催クラスの一意識別子
    ClassId
);
uuid_identifier!(
    /// 会員（ユーザー）の一意識別子
    UserId
);
uuid_identifier!(
    /// クラス種別の一意識別子
    ClassTypeId
);
uuid_identifier!(
    /// レベルの一意識別子
    LevelId
);
uuid_identifier!(
    /// インストラクターの一意識別子
    InstructorId
);

/// 料金を表す値オブジェクト
/// 最小単位（セント）で保持し、負の値は許可しない
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price {
    cents: i64,
}

impl Price {
    /// 無料
    pub const FREE: Price = Price { cents: 0 };

    /// 最小単位の金額から作成
    pub fn from_cents(cents: i64) -> Result<Self, DomainError> {
        if cents < 0 {
            return Err(DomainError::InvalidValue(
                "料金は0以上である必要があります".to_string(),
            ));
        }
        Ok(Self { cents })
    }

    /// "12.50" 形式の文字列から作成
    /// 小数点以下は2桁まで
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::InvalidValue(format!("無効な料金: {}", value));
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.starts_with('-') {
            return Err(invalid());
        }

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };
        if whole.is_empty()
            || fraction.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction))
            .ok_or_else(invalid)?;
        Self::from_cents(cents)
    }

    /// 最小単位の金額を取得
    pub fn cents(&self) -> i64 {
        self.cents
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

/// 予約のステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    /// 仮予約（作成直後、メール確認待ち）
    Pending,
    /// 確定済み（メール確認済み）
    Confirmed,
    /// キャンセル済み
    Cancelled,
    /// 出席済み
    Attended,
    /// 無断欠席
    NoShow,
}

impl BookingStatus {
    /// すべてのステータス
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Attended,
        BookingStatus::NoShow,
    ];

    /// 永続化・APIで使う文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Attended => "attended",
            BookingStatus::NoShow => "no_show",
        }
    }

    /// 文字列からBookingStatusを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "attended" => Ok(BookingStatus::Attended),
            "no_show" => Ok(BookingStatus::NoShow),
            _ => Err(DomainError::InvalidValue(format!(
                "無効な予約ステータス: {}",
                s
            ))),
        }
    }

    /// クラスの枠を占有している（重複予約の対象となる）状態か
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// クラスごとのステータス別予約件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: u32,
    pub confirmed: u32,
    pub cancelled: u32,
    pub attended: u32,
    pub no_show: u32,
}

impl StatusCounts {
    /// 指定ステータスの件数を加算
    pub fn add(&mut self, status: BookingStatus, count: u32) {
        let slot = match status {
            BookingStatus::Pending => &mut self.pending,
            BookingStatus::Confirmed => &mut self.confirmed,
            BookingStatus::Cancelled => &mut self.cancelled,
            BookingStatus::Attended => &mut self.attended,
            BookingStatus::NoShow => &mut self.no_show,
        };
        *slot = slot.saturating_add(count);
    }

    /// 指定ステータスの件数を取得
    pub fn get(&self, status: BookingStatus) -> u32 {
        match status {
            BookingStatus::Pending => self.pending,
            BookingStatus::Confirmed => self.confirmed,
            BookingStatus::Cancelled => self.cancelled,
            BookingStatus::Attended => self.attended,
            BookingStatus::NoShow => self.no_show,
        }
    }

    /// 確定済みとして扱う件数（確定 + 出席）
    pub fn confirmed_or_attended(&self) -> u32 {
        self.confirmed.saturating_add(self.attended)
    }
}
