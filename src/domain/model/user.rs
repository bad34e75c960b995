use crate::domain::model::UserId;

/// ユーザー
/// プロフィール管理は外部の責務。ここでは存在確認と所有者の照合にのみ使う
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    name: String,
    email: String,
}

impl User {
    /// ユーザーを作成
    pub fn new(id: UserId, name: String, email: String) -> Self {
        Self { id, name, email }
    }

    /// ユーザーIDを取得
    pub fn id(&self) -> UserId {
        self.id
    }

    /// 名前を取得
    pub fn name(&self) -> &str {
        &self.name
    }

    /// メールアドレスを取得
    pub fn email(&self) -> &str {
        &self.email
    }
}
