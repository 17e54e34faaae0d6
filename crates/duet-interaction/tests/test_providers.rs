use std::time::Duration;

use duet_core::config::{ApiProvider, GeminiConfig, OllamaConfig, OpenAiConfig, ProviderSettings};
use duet_core::provider::{ModelProvider, ProviderError};
use duet_interaction::{GeminiProvider, OllamaProvider, OpenAiProvider, ProviderClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Serves exactly one canned response and returns the raw request it received.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (base_url, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = socket.read(&mut chunk).await.unwrap();
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);

        let text = String::from_utf8_lossy(&buffer);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buffer.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[tokio::test]
async fn test_gemini_generate_through_custom_base_url() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"candidates":[{"content":{"parts":[{"text":"Hi from Gemini"}]}}]}"#,
    )
    .await;

    let provider = GeminiProvider::new(GeminiConfig {
        api_key: "secret".into(),
        base_url,
        ..GeminiConfig::default()
    });
    let text = provider
        .send("hello", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(text, "Hi from Gemini");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1beta/models/gemini-2.5-flash:generateContent?key=secret"));
    assert!(request.contains(r#""text":"hello""#));
}

#[tokio::test]
async fn test_openai_sends_bearer_and_reads_choice() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"choices":[{"message":{"role":"assistant","content":"pong"}}]}"#,
    )
    .await;

    let provider = OpenAiProvider::new(OpenAiConfig {
        api_key: "sk-test".into(),
        base_url,
        model: "local-model".into(),
    });
    let text = provider.send("ping", &CancellationToken::new()).await.unwrap();
    assert_eq!(text, "pong");

    let request = server.await.unwrap().to_ascii_lowercase();
    assert!(request.starts_with("post /v1/chat/completions"));
    assert!(request.contains("authorization: bearer sk-test"));
}

#[tokio::test]
async fn test_ollama_error_status_is_mapped() {
    let (base_url, server) =
        serve_once("404 Not Found", r#"{"error":"model 'nope' not found"}"#).await;

    let provider = OllamaProvider::new(OllamaConfig {
        base_url,
        model: "nope".into(),
    });
    let err = provider
        .send("hello", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ProviderError::Status {
            provider: "Ollama".into(),
            status: 404,
            message: "model 'nope' not found".into(),
        }
    );
    server.await.unwrap();
}

#[tokio::test]
async fn test_ollama_lists_models_sorted() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"models":[{"name":"mistral:latest"},{"name":"llama3:latest"}]}"#,
    )
    .await;

    let mut settings = ProviderSettings::default();
    settings.current_provider = ApiProvider::Ollama;
    settings.ollama.base_url = base_url;
    let client = ProviderClient::select(&settings).unwrap();

    let models = client.list_models().await.unwrap();
    assert_eq!(models, vec!["llama3:latest", "mistral:latest"]);
    assert!(server.await.unwrap().starts_with("GET /api/tags"));
}

#[tokio::test]
async fn test_cancel_aborts_a_hanging_request() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    // Accept and hold the connection without ever answering.
    let _server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(socket);
    });

    let provider = OllamaProvider::new(OllamaConfig {
        base_url,
        model: "llama3".into(),
    });
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(5), provider.send("hello", &cancel))
        .await
        .expect("send did not resolve after cancellation");
    assert_eq!(result, Err(ProviderError::Cancelled));
}
