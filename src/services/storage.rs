// src/services/storage.rs

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::common::error::AppError;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "pdf"];

// Referência devolvida pelo armazenamento: a URL pública que vai para o
// banco e a chave do arquivo no disco.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub url: String,
    pub key: String,
}

// O colaborador Blob Store dos comprovantes. Driver local em disco: o
// arquivo recebe uma chave UUID (nunca o nome original, que é entrada do
// usuário) e é servido de volta por /api/uploads/{chave}.
#[derive(Clone)]
pub struct ReceiptStorage {
    upload_dir: PathBuf,
    public_base_url: String,
    max_bytes: usize,
}

impl ReceiptStorage {
    pub fn new(upload_dir: PathBuf, public_base_url: String, max_upload_mb: usize) -> Self {
        Self {
            upload_dir,
            public_base_url,
            max_bytes: max_upload_mb * 1024 * 1024,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<StoredFile, AppError> {
        if bytes.is_empty() {
            return Err(AppError::InvalidUpload("arquivo vazio".into()));
        }
        if bytes.len() > self.max_bytes {
            return Err(AppError::InvalidUpload(format!(
                "arquivo excede o limite de {} MB",
                self.max_bytes / (1024 * 1024)
            )));
        }

        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .ok_or_else(|| AppError::InvalidUpload("arquivo sem extensão".into()))?;

        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AppError::InvalidUpload(format!(
                "extensão .{extension} não permitida"
            )));
        }

        let key = format!("{}.{}", Uuid::new_v4(), extension);

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(self.upload_dir.join(&key), bytes).await?;

        Ok(StoredFile {
            url: format!("{}/api/uploads/{}", self.public_base_url, key),
            key,
        })
    }

    // Leitura de um arquivo armazenado, para a rota que serve uploads.
    // A chave não pode navegar para fora do diretório.
    pub async fn read(&self, key: &str) -> Result<Vec<u8>, AppError> {
        if key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(AppError::FileNotFound);
        }

        match tokio::fs::read(self.upload_dir.join(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::FileNotFound),
            Err(e) => Err(e.into()),
        }
    }
}
