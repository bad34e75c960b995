use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::adapter::driver::request_dto::{PlaceOrderRequest, QuantityRequest};
use crate::adapter::driver::response_dto::{
    CartItemResponse, CartLineChangedResponse, CartLineResponse, MessageResponse, OrderResponse,
};
use crate::application::service::{CartApplicationService, Listing, OrderApplicationService};
use crate::application::ApplicationError;
use crate::domain::error::DomainError;
use crate::domain::model::{BookId, CartLine, CartLineId, OrderId, UserId};

/// 認証済みの呼び出し元ユーザーID（ゲートウェイが付与する）
pub const USER_ID_HEADER: &str = "x-user-id";
/// 認証済みの呼び出し元ロール（USER / ADMIN）
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

type ApiFailure = (StatusCode, Json<ApiError>);

fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiFailure {
    (
        status,
        Json(ApiError {
            error: message.into(),
            code: code.to_string(),
        }),
    )
}

// アプリケーションサービスを含む状態
#[derive(Clone)]
pub struct AppState {
    pub cart_service: Arc<CartApplicationService>,
    pub order_service: Arc<OrderApplicationService>,
}

/// 呼び出し元のロール
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl FromStr for Role {
    type Err = String;

    // 大文字小文字は区別しない
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("USER") {
            Ok(Role::User)
        } else if s.eq_ignore_ascii_case("ADMIN") {
            Ok(Role::Admin)
        } else {
            Err(format!("Unknown role: {}", s))
        }
    }
}

/// 認証済みの呼び出し元
/// トークンの検証は上流で済んでいる前提で、ヘッダーの値をそのまま信頼する
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: UserId,
    pub role: Role,
}

impl AuthContext {
    /// ロールが一致しなければ、拒否した操作を示すメッセージで403を返す
    fn require(&self, role: Role, refusal: &str) -> Result<(), ApiFailure> {
        if self.role == role {
            Ok(())
        } else {
            tracing::warn!(user_id = %self.user_id, role = ?self.role, "request refused for role");
            Err(api_error(StatusCode::FORBIDDEN, "FORBIDDEN", refusal))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiFailure;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_ID_HEADER)
            .and_then(|value| UserId::from_string(value).ok())
            .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", "Enter a Valid Token"))?;

        let role = header_value(parts, USER_ROLE_HEADER)
            .and_then(|value| value.parse::<Role>().ok())
            .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", "Enter a Valid Token"))?;

        Ok(AuthContext { user_id, role })
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
}

// REST APIルーターを作成
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/cart", get(get_cart).delete(remove_all_from_cart))
        .route("/carts", get(get_all_carts))
        .route("/cart/books/:book_id", post(add_to_cart))
        .route("/cart/books/:book_id/one", post(add_one_to_cart))
        .route("/cart/lines/:cart_line_id", delete(remove_from_cart).patch(adjust_quantity))
        .route("/cart/lines/:cart_line_id/increment", patch(increment_quantity))
        .route("/cart/lines/:cart_line_id/decrement", patch(decrement_quantity))
        .route("/orders", post(place_order).get(get_active_orders))
        .route("/orders/:order_id", get(get_order))
        .route("/orders/:order_id/cancel", post(cancel_order))
}

// ヘルスチェックエンドポイント
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "bookstore-checkout",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// カート追加エンドポイント
async fn add_to_cart(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(book_id): Path<Uuid>,
    Json(request): Json<QuantityRequest>,
) -> Result<(StatusCode, Json<CartLineChangedResponse>), ApiFailure> {
    auth.require(Role::User, "Token is NOT Valid to Add To Cart Book")?;

    let line = state
        .cart_service
        .add_to_cart(auth.user_id, BookId::from_uuid(book_id), request.quantity)
        .await
        .map_err(map_application_error)?;

    Ok((
        StatusCode::CREATED,
        Json(CartLineChangedResponse {
            message: "Book Added to Cart Successfully!!".to_string(),
            cart_line: CartLineResponse::from_cart_line(&line),
        }),
    ))
}

// 1冊だけカートに追加するエンドポイント
async fn add_one_to_cart(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(book_id): Path<Uuid>,
) -> Result<(StatusCode, Json<CartLineChangedResponse>), ApiFailure> {
    auth.require(Role::User, "Token is NOT Valid to Add To Cart Book")?;

    let line = state
        .cart_service
        .add_one_to_cart(auth.user_id, BookId::from_uuid(book_id))
        .await
        .map_err(map_application_error)?;

    Ok((
        StatusCode::CREATED,
        Json(CartLineChangedResponse {
            message: "Book Added to Cart Successfully!!".to_string(),
            cart_line: CartLineResponse::from_cart_line(&line),
        }),
    ))
}

// カート明細削除エンドポイント
async fn remove_from_cart(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(cart_line_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiFailure> {
    auth.require(Role::User, "Token is NOT Valid to Remove From Cart")?;

    state
        .cart_service
        .remove_line(auth.user_id, CartLineId::from_uuid(cart_line_id))
        .await
        .map_err(map_application_error)?;

    Ok(Json(MessageResponse::new("Remove From Cart Successfully")))
}

// カート全削除エンドポイント
async fn remove_all_from_cart(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<MessageResponse>, ApiFailure> {
    auth.require(Role::User, "Token is NOT Valid to Remove From Cart")?;

    state
        .cart_service
        .remove_all_for_user(auth.user_id)
        .await
        .map_err(map_application_error)?;

    Ok(Json(MessageResponse::new(format!(
        "All Cart Deleted for User ID: {}",
        auth.user_id
    ))))
}

// 数量変更エンドポイント
async fn adjust_quantity(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(cart_line_id): Path<Uuid>,
    Json(request): Json<QuantityRequest>,
) -> Result<Json<CartLineChangedResponse>, ApiFailure> {
    auth.require(Role::User, "Token is NOT Valid to Update the Cart")?;

    let line = state
        .cart_service
        .adjust_quantity(auth.user_id, CartLineId::from_uuid(cart_line_id), request.quantity)
        .await
        .map_err(map_application_error)?;

    Ok(Json(quantity_updated(&line)))
}

// 数量+1エンドポイント
async fn increment_quantity(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(cart_line_id): Path<Uuid>,
) -> Result<Json<CartLineChangedResponse>, ApiFailure> {
    auth.require(Role::User, "Token is NOT Valid to Update the Cart")?;

    let line = state
        .cart_service
        .increment_by_one(auth.user_id, CartLineId::from_uuid(cart_line_id))
        .await
        .map_err(map_application_error)?;

    Ok(Json(quantity_updated(&line)))
}

// 数量-1エンドポイント
async fn decrement_quantity(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(cart_line_id): Path<Uuid>,
) -> Result<Json<CartLineChangedResponse>, ApiFailure> {
    auth.require(Role::User, "Token is NOT Valid to Update the Cart")?;

    let line = state
        .cart_service
        .decrement_by_one(auth.user_id, CartLineId::from_uuid(cart_line_id))
        .await
        .map_err(map_application_error)?;

    Ok(Json(quantity_updated(&line)))
}

fn quantity_updated(line: &CartLine) -> CartLineChangedResponse {
    CartLineChangedResponse {
        message: "Cart Quantity Updated Successfully".to_string(),
        cart_line: CartLineResponse::from_cart_line(line),
    }
}

// 自分のカート取得エンドポイント
async fn get_cart(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<CartItemResponse>>, ApiFailure> {
    auth.require(Role::User, "Token is NOT Valid to Get the Cart Details")?;

    let items = state
        .cart_service
        .list_for_user(auth.user_id)
        .await
        .map_err(map_application_error)?;

    Ok(Json(items.into_iter().map(CartItemResponse::from).collect()))
}

// 全カート取得エンドポイント（管理者）
async fn get_all_carts(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Response, ApiFailure> {
    auth.require(Role::Admin, "Token is NOT Valid to Get All Cart!!")?;

    let listing = state
        .cart_service
        .list_all()
        .await
        .map_err(map_application_error)?;

    Ok(match listing {
        Listing::Empty => Json(MessageResponse::new("No Cart Is Present!!")).into_response(),
        Listing::Items(items) => Json(
            items
                .into_iter()
                .map(CartItemResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
    })
}

// 注文確定エンドポイント
async fn place_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiFailure> {
    auth.require(Role::User, "Token is NOT Valid to Place Order!!")?;
    request
        .validate()
        .map_err(|msg| api_error(StatusCode::BAD_REQUEST, "INVALID_ADDRESS", msg))?;

    let order = state
        .order_service
        .place_order(auth.user_id, request.into())
        .await
        .map_err(map_application_error)?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from_order(&order))))
}

// 注文キャンセルエンドポイント
async fn cancel_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(order_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiFailure> {
    auth.require(Role::User, "Token is NOT Valid to Cancel Order from Cart!!")?;

    let message = state
        .order_service
        .cancel_order(auth.user_id, OrderId::from_uuid(order_id))
        .await
        .map_err(map_application_error)?;

    Ok(Json(MessageResponse::new(message)))
}

// 有効な注文一覧エンドポイント（管理者）
async fn get_active_orders(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Response, ApiFailure> {
    auth.require(Role::Admin, "Token is NOT Valid to Get All Orders!!")?;

    let listing = state
        .order_service
        .list_active_orders()
        .await
        .map_err(map_application_error)?;

    Ok(match listing {
        Listing::Empty => Json(MessageResponse::new("No Order Is Present!!")).into_response(),
        Listing::Items(orders) => Json(
            orders
                .iter()
                .map(OrderResponse::from_order)
                .collect::<Vec<_>>(),
        )
        .into_response(),
    })
}

// 注文詳細エンドポイント（注文者本人または管理者）
async fn get_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiFailure> {
    let order_id = OrderId::from_uuid(order_id);

    let order = match auth.role {
        Role::Admin => state.order_service.get_order(order_id).await,
        Role::User => {
            state
                .order_service
                .get_order_for_user(auth.user_id, order_id)
                .await
        }
    }
    .map_err(map_application_error)?;

    Ok(Json(OrderResponse::from_order(&order)))
}

// アプリケーションエラーを適切なHTTPステータスコードとエラーコードにマッピング
fn map_application_error(err: ApplicationError) -> ApiFailure {
    match err {
        ApplicationError::Domain(domain_err) => map_domain_error(domain_err),
        ApplicationError::Repository(repo_err) if repo_err.is_retryable() => {
            tracing::warn!(error = %repo_err, "retryable conflict");
            api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "RETRYABLE_CONFLICT",
                repo_err.to_string(),
            )
        }
        ApplicationError::Repository(repo_err) => {
            tracing::error!(error = %repo_err, "repository failure");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "REPOSITORY_ERROR",
                repo_err.to_string(),
            )
        }
        ApplicationError::NotFound(msg) => api_error(StatusCode::NOT_FOUND, "NOT_FOUND", msg),
        ApplicationError::Unauthorized(msg) => api_error(StatusCode::FORBIDDEN, "FORBIDDEN", msg),
    }
}

// ドメインエラーを適切なHTTPステータスコードとエラーコードにマッピング
fn map_domain_error(domain_err: DomainError) -> ApiFailure {
    let message = domain_err.to_string();
    match domain_err {
        DomainError::InsufficientStock { .. } => {
            api_error(StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK", message)
        }
        DomainError::InvalidQuantity(_) => {
            api_error(StatusCode::BAD_REQUEST, "INVALID_QUANTITY", message)
        }
        DomainError::InvalidValue(_) => api_error(StatusCode::BAD_REQUEST, "INVALID_VALUE", message),
        DomainError::AlreadyCancelled(_) => {
            api_error(StatusCode::CONFLICT, "ALREADY_CANCELLED", message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::port::RepositoryError;

    #[test]
    fn test_role_from_str_is_case_insensitive() {
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
        assert!("guest".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_map_application_error_not_found() {
        let app_error = ApplicationError::NotFound("Order NOT Found with ID : 2".to_string());
        let (status, Json(api_error)) = map_application_error(app_error);

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(api_error.code, "NOT_FOUND");
        assert_eq!(api_error.error, "Order NOT Found with ID : 2");
    }

    #[test]
    fn test_map_application_error_conflict_is_retryable() {
        let app_error = ApplicationError::from(RepositoryError::Conflict("lock wait".to_string()));
        let (status, Json(api_error)) = map_application_error(app_error);

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api_error.code, "RETRYABLE_CONFLICT");

        let app_error = ApplicationError::from(RepositoryError::OperationFailed("x".to_string()));
        let (status, _) = map_application_error(app_error);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_map_domain_errors() {
        let (status, Json(api_error)) = map_domain_error(DomainError::InsufficientStock {
            requested: 6,
            available: 5,
        });
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.code, "INSUFFICIENT_STOCK");

        let (status, Json(api_error)) = map_domain_error(DomainError::AlreadyCancelled(OrderId::new()));
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(api_error.code, "ALREADY_CANCELLED");
    }

    #[test]
    fn test_unauthorized_maps_to_forbidden() {
        let (status, Json(api_error)) = map_application_error(ApplicationError::Unauthorized(
            "NOT Eligible to CANCEL the Order!!".to_string(),
        ));
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(api_error.error, "NOT Eligible to CANCEL the Order!!");
    }
}
