use crate::domain::error::DomainError;
use crate::domain::model::UserId;
use std::fmt;

/// 利用者のロール
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// 会員
    Member,
    /// インストラクター
    Instructor,
    /// 管理者（スタッフ）
    Admin,
}

impl Role {
    /// 文字列からRoleを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "member" => Ok(Role::Member),
            "instructor" => Ok(Role::Instructor),
            "admin" => Ok(Role::Admin),
            _ => Err(DomainError::InvalidValue(format!("無効なロール: {}", s))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Instructor => "instructor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 操作を行う利用者
/// 認証は外部で行われ、ここでは識別子とロールのみを扱う
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    user_id: UserId,
    role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// 会員として作成
    pub fn member(user_id: UserId) -> Self {
        Self::new(user_id, Role::Member)
    }

    /// 管理者として作成
    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// スタッフ（全予約を参照・操作できる）か
    pub fn is_staff(&self) -> bool {
        self.role == Role::Admin
    }

    /// 出席・欠席を記録できるか
    pub fn can_record_attendance(&self) -> bool {
        matches!(self.role, Role::Instructor | Role::Admin)
    }

    /// 指定ユーザーの予約を扱えるか（本人またはスタッフ）
    pub fn can_act_for(&self, owner: UserId) -> bool {
        self.is_staff() || self.user_id == owner
    }
}
