// src/handlers/uploads.rs

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::{common::error::AppError, config::AppState};

// Serve os comprovantes armazenados pelo driver local. A chave é o nome
// UUID gerado no upload; o ReceiptStorage rejeita travessia de
// diretório.
#[utoipa::path(
    get,
    path = "/api/uploads/{filename}",
    tag = "Uploads",
    responses(
        (status = 200, description = "Conteúdo do arquivo"),
        (status = 404, description = "Arquivo não encontrado")
    ),
    params(("filename" = String, Path, description = "Chave do arquivo"))
)]
pub async fn get_uploaded_file(
    State(app_state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = app_state.storage.read(&filename).await?;

    let content_type = mime_guess::from_path(&filename)
        .first_or_octet_stream()
        .to_string();

    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
