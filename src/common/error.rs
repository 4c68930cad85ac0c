use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// Cada falha de negócio tem a sua própria variante; a camada HTTP decide
// o status code no IntoResponse abaixo.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Linha de carrinho inválida: {0}")]
    InvalidCartLine(String),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Produto {0} não encontrado")]
    ProductNotFound(i64),

    #[error("Categoria não encontrada")]
    CategoryNotFound,

    #[error("Pack não encontrado")]
    PackNotFound,

    #[error("Variante de pack {0} não encontrada")]
    PackVariantNotFound(i64),

    #[error("Pedido não encontrado")]
    OrderNotFound,

    #[error("Comprovante não encontrado")]
    ReceiptNotFound,

    #[error("Pagamento não encontrado")]
    PaymentNotFound,

    #[error("Arquivo não encontrado")]
    FileNotFound,

    #[error("Estoque insuficiente para {0}")]
    InsufficientStock(String),

    #[error("Acesso negado")]
    AccessDenied,

    #[error("Status inválido: {0}")]
    InvalidStatus(String),

    #[error("Upload inválido: {0}")]
    InvalidUpload(String),

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de E/S")]
    IoError(#[from] std::io::Error),

    // Variante genérica para qualquer outro erro inesperado
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::InvalidCartLine(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Linha de carrinho inválida: {msg}"),
            ),
            AppError::EmailAlreadyExists => {
                (StatusCode::CONFLICT, "Este e-mail já está em uso.".into())
            }
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "E-mail ou senha inválidos.".into(),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".into(),
            ),
            AppError::UserNotFound => {
                (StatusCode::NOT_FOUND, "Usuário não encontrado.".into())
            }
            AppError::ProductNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Produto {id} não encontrado."))
            }
            AppError::CategoryNotFound => {
                (StatusCode::NOT_FOUND, "Categoria não encontrada.".into())
            }
            AppError::PackNotFound => {
                (StatusCode::NOT_FOUND, "Pack não encontrado.".into())
            }
            AppError::PackVariantNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Variante de pack {id} não encontrada."),
            ),
            AppError::OrderNotFound => {
                (StatusCode::NOT_FOUND, "Pedido não encontrado.".into())
            }
            AppError::ReceiptNotFound => {
                (StatusCode::NOT_FOUND, "Comprovante não encontrado.".into())
            }
            AppError::PaymentNotFound => {
                (StatusCode::NOT_FOUND, "Pagamento não encontrado.".into())
            }
            AppError::FileNotFound => {
                (StatusCode::NOT_FOUND, "Arquivo não encontrado.".into())
            }
            AppError::InsufficientStock(name) => (
                StatusCode::BAD_REQUEST,
                format!("Estoque insuficiente para {name}."),
            ),
            AppError::AccessDenied => (StatusCode::FORBIDDEN, "Acesso negado.".into()),
            AppError::InvalidStatus(status) => {
                (StatusCode::BAD_REQUEST, format!("Status inválido: {status}."))
            }
            AppError::InvalidUpload(msg) => {
                (StatusCode::BAD_REQUEST, format!("Upload inválido: {msg}."))
            }

            // Todos os outros erros (DatabaseError, IoError, InternalServerError...)
            // viram 500. O `tracing` loga a mensagem detalhada que o `thiserror`
            // nos deu; o cliente só vê uma mensagem genérica.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".into(),
                )
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
