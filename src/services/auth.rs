// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, User, UserRole},
};

// O colaborador de Autenticação: emite e valida credenciais e devolve a
// identidade resolvida (id + papel). O resto do sistema nunca mexe com
// senha ou token.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String) -> Self {
        Self {
            user_repo,
            jwt_secret,
        }
    }

    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<String, AppError> {
        // O hashing é caro de propósito; roda fora do executor async.
        let password_clone = password.to_owned();
        let hashed_password =
            tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        // Registro público sempre cria cliente; o admin é semeado na
        // inicialização.
        let new_user = self
            .user_repo
            .create_user(email, &hashed_password, full_name, UserRole::Customer)
            .await?;

        self.create_token(&new_user)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::InvalidCredentials);
        }

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(&user)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        let user = self
            .user_repo
            .find_by_id(token_data.claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)?;

        // Conta desativada invalida o token mesmo dentro da validade.
        if !user.is_active {
            return Err(AppError::InvalidToken);
        }

        Ok(user)
    }

    // Garante a conta de admin configurada no ambiente. Idempotente:
    // se o e-mail já existe, não toca em nada.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<(), AppError> {
        if self.user_repo.find_by_email(email).await?.is_some() {
            return Ok(());
        }

        let password_clone = password.to_owned();
        let hashed_password =
            tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        self.user_repo
            .create_user(email, &hashed_password, "Administrador", UserRole::Admin)
            .await?;

        tracing::info!("Conta de admin {} criada na inicialização.", email);
        Ok(())
    }

    fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: user.id,
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    fn service(pool: SqlitePool) -> AuthService {
        AuthService::new(UserRepository::new(pool), "segredo-de-teste".into())
    }

    #[sqlx::test]
    async fn registro_e_login_devolvem_tokens_validos(pool: SqlitePool) {
        let auth = service(pool);

        let token = auth
            .register_user("ana@example.com", "senha123", "Ana Lima")
            .await
            .unwrap();
        let user = auth.validate_token(&token).await.unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.role, UserRole::Customer);

        let token = auth.login_user("ana@example.com", "senha123").await.unwrap();
        let user = auth.validate_token(&token).await.unwrap();
        assert_eq!(user.full_name, "Ana Lima");
    }

    #[sqlx::test]
    async fn senha_errada_e_rejeitada(pool: SqlitePool) {
        let auth = service(pool);
        auth.register_user("ana@example.com", "senha123", "Ana Lima")
            .await
            .unwrap();

        let result = auth.login_user("ana@example.com", "senha errada").await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[sqlx::test]
    async fn email_duplicado_e_rejeitado(pool: SqlitePool) {
        let auth = service(pool);
        auth.register_user("ana@example.com", "senha123", "Ana Lima")
            .await
            .unwrap();

        let result = auth
            .register_user("ana@example.com", "outra-senha", "Outra Ana")
            .await;
        assert!(matches!(result, Err(AppError::EmailAlreadyExists)));
    }

    #[sqlx::test]
    async fn token_adulterado_e_rejeitado(pool: SqlitePool) {
        let auth = service(pool);
        let token = auth
            .register_user("ana@example.com", "senha123", "Ana Lima")
            .await
            .unwrap();

        let mut adulterado = token.clone();
        adulterado.push('x');
        assert!(matches!(
            auth.validate_token(&adulterado).await,
            Err(AppError::InvalidToken)
        ));
    }

    #[sqlx::test]
    async fn ensure_admin_e_idempotente(pool: SqlitePool) {
        let auth = service(pool);
        auth.ensure_admin("admin@example.com", "Admin123!").await.unwrap();
        auth.ensure_admin("admin@example.com", "Admin123!").await.unwrap();

        let token = auth.login_user("admin@example.com", "Admin123!").await.unwrap();
        let user = auth.validate_token(&token).await.unwrap();
        assert_eq!(user.role, UserRole::Admin);
    }
}
