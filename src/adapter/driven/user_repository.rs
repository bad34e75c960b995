use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{User, UserId};
use crate::domain::port::{RepositoryError, UserRepository};
use async_trait::async_trait;
use sqlx::{MySql, Pool, Row};

/// MySQLユーザーリポジトリ
/// usersテーブルは参照のみ（登録・更新は外部のユーザー管理が行う）
#[derive(Clone)]
pub struct MySqlUserRepository {
    pool: Pool<MySql>,
}

impl MySqlUserRepository {
    /// 新しいMySQLユーザーリポジトリを作成
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, email FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx("ユーザーの取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        match row {
            Some(row) => {
                let id = UserId::from_string(row.get("id")).map_err(|e| {
                    RepositoryError::FetchFailed(format!("ユーザーIDの解析に失敗しました: {}", e))
                })?;
                Ok(Some(User::new(id, row.get("name"), row.get("email"))))
            }
            None => Ok(None),
        }
    }
}
