//! Local chat-completions endpoint for tests. Records every request body and
//! answers each one with the same canned assistant message.

use actix_web::dev::ServerHandle;
use actix_web::{App, HttpResponse, HttpServer, web};
use serde_json::{Value, json};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use super::client::LlmClient;
use crate::config::LlmSettings;

struct Recorded {
    reply: String,
    requests: Mutex<Vec<Value>>,
}

pub struct FakeCompletions {
    recorded: web::Data<Recorded>,
    base_url: Url,
    handle: ServerHandle,
}

async fn completions(recorded: web::Data<Recorded>, body: web::Json<Value>) -> HttpResponse {
    recorded.requests.lock().unwrap().push(body.into_inner());
    HttpResponse::Ok().json(json!({
        "choices": [{"message": {"role": "assistant", "content": recorded.reply}}]
    }))
}

impl FakeCompletions {
    pub async fn start(reply: &str) -> Self {
        let recorded = web::Data::new(Recorded {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        });
        let app_data = recorded.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(app_data.clone())
                .route("/v1/chat/completions", web::post().to(completions))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            recorded,
            base_url: Url::parse(&format!("http://{}/v1", addr)).unwrap(),
            handle,
        }
    }

    pub fn client(&self) -> LlmClient {
        LlmClient::new(&LlmSettings {
            api_key: "test-key".into(),
            base_url: self.base_url.clone(),
            model: "test-model".into(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    pub fn requests(&self) -> Vec<Value> {
        self.recorded.requests.lock().unwrap().clone()
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}
