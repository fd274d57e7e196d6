use anyhow::Context;
use clap::Args;
use serde_json::json;

use crate::app::AppState;
use crate::cli::OutputFormat;
use crate::config::{AppConfig, StorageBackend};
use crate::database::models::{NewUser, User};
use crate::error::ApiError;
use crate::dto::RegisterRequest;
use crate::types::Role;
use crate::validation::parse_validated;

#[derive(Args, Debug)]
pub struct CreateUserArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long, env = "ASM_NEW_USER_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    #[arg(long, default_value = "WORKER", help = "ADMIN, MANAGER, WORKER or OFFICE_ADMIN")]
    pub role: Role,
}

/// Same field rules as self-service registration, but any role may be assigned
pub async fn handle(config: AppConfig, args: CreateUserArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    if config.storage.backend != StorageBackend::Postgres {
        anyhow::bail!("create-user requires ASM_STORAGE=postgres");
    }

    let request: RegisterRequest = parse_validated(json!({
        "email": args.email,
        "password": args.password,
        "firstName": args.first_name,
        "lastName": args.last_name,
    }))
    .map_err(describe_rejection)?;

    let state = AppState::connect(config).await?;
    let result = create(&state, request, args.role).await;
    state.shutdown().await;
    let user = result?;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
        OutputFormat::Text => println!("Created {} user {} ({})", user.role, user.email, user.id),
    }
    Ok(())
}

async fn create(state: &AppState, request: RegisterRequest, role: Role) -> anyhow::Result<User> {
    let password_hash = state.passwords.hash(request.password).await?;
    let user = state
        .store
        .create_user(NewUser {
            email: request.email,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            role,
        })
        .await
        .context("failed to create user")?;
    tracing::info!(user_id = %user.id, role = %user.role, "Created user from the command line");
    Ok(user)
}

fn describe_rejection(err: ApiError) -> anyhow::Error {
    match err {
        ApiError::ValidationFailed(errors) => {
            let lines: Vec<String> = errors.iter().map(|e| format!("{}: {}", e.field, e.message)).collect();
            anyhow::anyhow!("invalid user details\n  {}", lines.join("\n  "))
        }
        other => anyhow::Error::new(other),
    }
}
