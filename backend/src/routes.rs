use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use serde_json::json;
use shared::{
    AnalysisResponse, ChatMessageRequest, ChatMessagesResponse, CreateChatResponse,
    FollowUpRequest, FollowUpResponse,
};
use uuid::Uuid;

use crate::analysis::Analyzer;
use crate::auth;
use crate::auth::middleware::{AuthMiddleware, AuthenticatedUser};
use crate::chat::ChatService;
use crate::error::ApiError;
use crate::llm;
use crate::storage::S3Service;
use crate::storage::s3_service::{MAX_UPLOAD_BYTES, mime_type_for_key};

pub fn configure_routes(cfg: &mut web::ServiceConfig, auth_middleware: AuthMiddleware) {
    cfg.service(
        web::scope("/api")
            .wrap(auth_middleware)
            .route("/health", web::get().to(health))
            .route("/auth/me", web::get().to(auth::routes::me))
            .route("/analyze", web::post().to(analyze))
            .route("/chat", web::post().to(follow_up))
            .service(
                web::resource("/chats")
                    .route(web::get().to(list_chats))
                    .route(web::post().to(create_chat)),
            )
            .route("/chats/{chat_id}", web::get().to(get_chat))
            .route("/chats/{chat_id}/messages", web::post().to(post_message))
            .route("/chats/{chat_id}/image", web::get().to(get_chat_image)),
    );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({"status": "ok"}))
}

#[derive(Debug, Default)]
struct AnalysisUpload {
    plant_name: Option<String>,
    image: Option<Vec<u8>>,
    chat_id: Option<String>,
}

fn field_text(data: Vec<u8>, name: &str) -> Result<String, ApiError> {
    String::from_utf8(data)
        .map(|s| s.trim().to_string())
        .map_err(|_| ApiError::BadRequest(format!("Field '{}' must be UTF-8 text", name)))
}

/// Reads every field into memory, rejecting any field larger than `field_limit` bytes.
async fn read_analysis_upload(
    mut payload: Multipart,
    field_limit: usize,
) -> Result<AnalysisUpload, ApiError> {
    let mut upload = AnalysisUpload::default();

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().unwrap_or_default().to_string();
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > field_limit {
                warn!("Multipart field '{}' exceeds {} bytes", name, field_limit);
                return Err(ApiError::BadRequest(format!(
                    "Field '{}' exceeds the {} byte upload limit",
                    name, field_limit
                )));
            }
            data.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "plant_name" | "crop" => upload.plant_name = Some(field_text(data, &name)?),
            "image" | "file" => upload.image = Some(data),
            "chat_id" => upload.chat_id = Some(field_text(data, &name)?),
            other => warn!("Ignoring unexpected multipart field '{}'", other),
        }
    }
    Ok(upload)
}

async fn analyze(
    user: AuthenticatedUser,
    analyzer: web::Data<Analyzer>,
    chat: web::Data<ChatService>,
    s3: Option<web::Data<S3Service>>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = read_analysis_upload(payload, MAX_UPLOAD_BYTES).await?;
    let plant_name = upload
        .plant_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("plant_name is required".to_string()))?;
    let image = web::Bytes::from(
        upload
            .image
            .filter(|data| !data.is_empty())
            .ok_or_else(|| ApiError::BadRequest("image file is required".to_string()))?,
    );
    let chat_id = upload
        .chat_id
        .filter(|id| !id.is_empty())
        .map(|id| Uuid::parse_str(&id))
        .transpose()
        .map_err(|_| ApiError::BadRequest("chat_id must be a UUID".to_string()))?;
    if let Some(chat_id) = chat_id {
        chat.ensure_owned(chat_id, user.0.id).await?;
    }

    let pipeline_input = image.clone();
    let analysis = web::block(move || analyzer.analyze(&pipeline_input)).await??;
    info!(
        "Analysis for {} by {}: stress {}%, stage {}",
        plant_name,
        user.0.id,
        analysis.report.plant_health.stress_percentage,
        analysis.report.plant_health.disease_stage
    );

    let insights = llm::generate_insights(chat.llm(), &plant_name, &analysis.report).await;

    let image_key = match s3 {
        Some(s3) => store_image(&s3, user.0.id, &image).await,
        None => None,
    };

    if let Some(chat_id) = chat_id {
        chat.record_analysis(
            chat_id,
            user.0.id,
            &plant_name,
            image_key,
            &analysis.report,
            &insights,
        )
        .await?;
    }

    Ok(HttpResponse::Ok().json(AnalysisResponse {
        plant_name,
        analysis: analysis.report,
        thermal_summary: analysis.thermal_summary,
        images: analysis.images,
        insights,
        chat_id,
    }))
}

/// Failures are logged and yield no key; the analysis itself still succeeds.
async fn store_image(s3: &S3Service, user_id: Uuid, image: &[u8]) -> Option<String> {
    let Some(mime_type) = image::guess_format(image).ok().map(|f| f.to_mime_type()) else {
        warn!("Could not determine image format; upload not stored");
        return None;
    };
    match s3.store_upload(user_id, image, mime_type).await {
        Ok(stored) => {
            info!("Stored upload {} ({})", stored.key, stored.hash);
            Some(stored.key)
        }
        Err(e) => {
            error!("Failed to store upload for user {}: {}", user_id, e);
            None
        }
    }
}

async fn follow_up(
    _user: AuthenticatedUser,
    chat: web::Data<ChatService>,
    request: web::Json<FollowUpRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    if request.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question is required".to_string()));
    }

    let reply = llm::answer_follow_up(
        chat.llm(),
        request.plant_name.as_deref(),
        &request.stats,
        request.previous_response.as_ref(),
        &request.question,
    )
    .await?;
    Ok(HttpResponse::Ok().json(FollowUpResponse { reply }))
}

async fn list_chats(
    user: AuthenticatedUser,
    chat: web::Data<ChatService>,
) -> Result<HttpResponse, ApiError> {
    let summaries = chat.list_threads(user.0.id).await?;
    Ok(HttpResponse::Ok().json(summaries))
}

async fn create_chat(
    user: AuthenticatedUser,
    chat: web::Data<ChatService>,
) -> Result<HttpResponse, ApiError> {
    let chat_id = chat.create_thread(user.0.id, &user.0.email).await?;
    Ok(HttpResponse::Ok().json(CreateChatResponse { chat_id }))
}

async fn get_chat(
    user: AuthenticatedUser,
    chat: web::Data<ChatService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let conversation = chat.conversation(path.into_inner(), user.0.id).await?;
    Ok(HttpResponse::Ok().json(conversation))
}

async fn post_message(
    user: AuthenticatedUser,
    chat: web::Data<ChatService>,
    path: web::Path<Uuid>,
    request: web::Json<ChatMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    let chat_id = path.into_inner();
    let conversation = chat
        .continue_chat(chat_id, user.0.id, &request.message)
        .await?;
    Ok(HttpResponse::Ok().json(ChatMessagesResponse {
        chat_id,
        conversation,
    }))
}

async fn get_chat_image(
    user: AuthenticatedUser,
    chat: web::Data<ChatService>,
    s3: Option<web::Data<S3Service>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let conversation = chat.conversation(path.into_inner(), user.0.id).await?;
    let (Some(s3), Some(key)) = (s3, conversation.main_image) else {
        return Err(ApiError::NotFound);
    };

    let bytes = s3
        .get_image(&key)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to fetch {}: {}", key, e)))?;
    Ok(HttpResponse::Ok()
        .content_type(mime_type_for_key(&key))
        .body(bytes))
}
