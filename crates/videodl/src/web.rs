//! Routes of the `/video` web page: the bookmarklet target and the history editor.

use axum::{
    extract::{Query, Request, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::{
    history::ListKind,
    manager::{Manager, WEB_PATH},
    video::Video,
};

const INDEX_HTML: &str = include_str!("index.html");

const CLOSE_WINDOW: &str = r#"<script language="javascript" type="text/javascript"> window.close(); </script>"#;

/// Query string of the video routes.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VideoQuery {
    url: Option<String>,
    viewed: Option<String>,
    path: Option<String>,
}

impl VideoQuery {
    /// The url of the video the request is about, as stored in the history.
    fn url(&self) -> Option<String> {
        match &self.url {
            Some(url) if !url.is_empty() => Some(unescape_html(url)),
            _ => {
                log::error!("Video request without url");
                None
            }
        }
    }

    fn viewed(&self) -> Option<bool> {
        self.viewed.as_deref().map(|viewed| viewed == "true")
    }
}

/// One line of the lists shown by the page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Entry {
    name: String,
    is_dir: bool,
    mode: u32,
    viewed: bool,
    #[serde(rename = "URL")]
    url: String,
    fail: bool,
}

impl From<&Video> for Entry {
    fn from(video: &Video) -> Self {
        Entry { name: video.name.clone(), is_dir: false, mode: 0o644, viewed: video.viewed, url: escape_html(&video.url), fail: video.fail }
    }
}

fn escape_html(text: &str) -> String {
    html_escape::encode_quoted_attribute(text).into_owned()
}

fn unescape_html(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// The routes under [`WEB_PATH`], with the full request path.
pub fn router(manager: Manager) -> Router {
    let route = |path: &str| format!("{}{}", WEB_PATH, path);
    Router::new()
        .route(WEB_PATH, get(index))
        .route(&route("/"), get(index))
        .route(&route("/linkadd"), get(link_add))
        .route(&route("/add"), get(add))
        .route(&route("/add/"), get(add))
        .route(&route("/list"), get(list_done))
        .route(&route("/queue"), get(list_queue))
        .route(&route("/fileinfo"), get(file_info))
        .route(&route("/viewed"), get(viewed))
        .route(&route("/listremoveone"), get(remove_one))
        .route(&route("/viewfile"), get(view_file))
        .route(&route("/openvideo"), get(open_video))
        .route(&route("/editquality"), get(edit_quality))
        .fallback(unknown)
        .with_state(manager)
}

async fn unknown(uri: Uri) -> StatusCode {
    log::error!("Web service: bad address {}", uri);
    StatusCode::OK
}

async fn index() -> Html<&'static str> {
    log::debug!("Video index called");
    Html(INDEX_HTML)
}

/// The bookmarklet to drop in the browser bar: it sends the current page to `/add`.
async fn link_add(State(manager): State<Manager>) -> String {
    format!(
        "javascript:u=document.location.href;t=document.title;dock=\"{}/add/?title=\"+escape(t)+'&url='+escape(u);void(window.open(dock,'_blank','{}'));",
        manager.web_url(),
        manager.js_window_option()
    )
}

async fn add(State(manager): State<Manager>, Query(query): Query<VideoQuery>) -> Response {
    let Some(url) = query.url() else { return StatusCode::OK.into_response() };
    log::info!("Web add {}", url);
    applet_runtime::print_result_err!("adding a video from the web", manager.download(&url).await);
    Html(CLOSE_WINDOW).into_response()
}

fn entries(manager: &Manager, kind: ListKind) -> Json<Vec<Entry>> {
    Json(manager.history().list(kind).into_iter().map(Entry::from).collect())
}

async fn list_done(State(manager): State<Manager>) -> Json<Vec<Entry>> {
    entries(&manager, ListKind::Done)
}

async fn list_queue(State(manager): State<Manager>) -> Json<Vec<Entry>> {
    entries(&manager, ListKind::Queue)
}

/// The full record, after applying the optional `viewed` change.
async fn file_info(State(manager): State<Manager>, Query(query): Query<VideoQuery>) -> Response {
    let Some(url) = query.url() else { return StatusCode::OK.into_response() };
    let viewed = query.viewed();
    let result = manager.history().update(&url, |video| {
        if let Some(viewed) = viewed {
            video.viewed = viewed;
        }
        video.clone()
    });
    match result {
        Ok(video) => Json(video).into_response(),
        Err(err) => {
            log::error!("Web fileinfo: {}", err);
            StatusCode::OK.into_response()
        }
    }
}

async fn viewed(State(manager): State<Manager>, Query(query): Query<VideoQuery>) -> Response {
    let Some(url) = query.url() else { return StatusCode::OK.into_response() };
    let Some(viewed) = query.viewed() else {
        log::error!("Web viewed: missing the viewed flag for {}", url);
        return StatusCode::OK.into_response();
    };
    match manager.history().update(&url, |video| {
        video.viewed = viewed;
        video.viewed
    }) {
        Ok(viewed) => viewed.to_string().into_response(),
        Err(err) => {
            log::error!("Web viewed: {}", err);
            StatusCode::OK.into_response()
        }
    }
}

async fn remove_one(State(manager): State<Manager>, Query(query): Query<VideoQuery>) -> StatusCode {
    let Some(url) = query.url() else { return StatusCode::OK };
    let kind = match query.path.as_deref().map(str::parse::<ListKind>) {
        Some(Ok(kind)) => kind,
        other => {
            log::error!("Web listremoveone: bad list {:?} for {}", other, url);
            return StatusCode::OK;
        }
    };
    match manager.history().remove(&url, kind) {
        Ok(video) => log::info!("Removed {} from the {} list", video.name, kind),
        Err(err) => log::error!("Web listremoveone: {}", err),
    }
    StatusCode::OK
}

fn known_video(manager: &Manager, query: &VideoQuery) -> Option<Video> {
    let url = query.url()?;
    let video = manager.history().find(&url).cloned();
    if video.is_none() {
        log::error!("Web service: no video with url {}", url);
    }
    video
}

/// Stream the downloaded file, with range support for the player.
async fn view_file(State(manager): State<Manager>, Query(query): Query<VideoQuery>, request: Request) -> Response {
    let Some(video) = known_video(&manager, &query) else { return StatusCode::OK.into_response() };
    let path = manager.file_path(&video);
    log::info!("Web viewfile {}", path.display());
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

async fn open_video(State(manager): State<Manager>, Query(query): Query<VideoQuery>) -> StatusCode {
    if let Some(video) = known_video(&manager, &query) {
        manager.open_video(&video);
    }
    StatusCode::OK
}

async fn edit_quality(State(manager): State<Manager>, Query(query): Query<VideoQuery>) -> StatusCode {
    if let Some(video) = known_video(&manager, &query) {
        // the dialog answer comes later, on the dock side
        tokio::spawn(async move {
            applet_runtime::print_result_err!("editing the quality", manager.edit_quality(&video.url).await);
        });
    }
    StatusCode::OK
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        history::{VideoHistory, HISTORY_FILE},
        manager::test::{fixture, Fixture},
    };
    use axum::body::Body;
    use dock_shared_util::FileAccess;
    use pretty_assertions::assert_eq;

    async fn get_body(manager: &Manager, uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = router(manager.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn done_video(manager: &Manager, url: &str, name: &str) {
        manager.enqueue(Video::new(url, name)).unwrap();
        manager.history().finish(url, false).unwrap();
    }

    #[tokio::test]
    async fn test_viewed_toggle_is_saved() {
        let Fixture { manager, dir, .. } = fixture();
        manager.set_enabled_dl(false);
        done_video(&manager, "https://host/v?a=1&b=2", "Talk");

        let (status, body) = get_body(&manager, "/video/viewed?url=https%3A%2F%2Fhost%2Fv%3Fa%3D1%26amp%3Bb%3D2&viewed=true").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "true");

        let (_, list) = get_body(&manager, "/video/list").await;
        let list: serde_json::Value = serde_json::from_str(&list).unwrap();
        assert_eq!(list[0]["Viewed"], true);
        assert_eq!(list[0]["URL"], "https://host/v?a=1&amp;b=2");
        assert_eq!(list[0]["Mode"], 420);

        let mut saved = VideoHistory::new(FileAccess::new());
        saved.set_path(dir.path().join(HISTORY_FILE)).unwrap();
        assert!(saved.find("https://host/v?a=1&b=2").unwrap().viewed);
    }

    #[tokio::test]
    async fn test_lists_and_removal() {
        let Fixture { manager, .. } = fixture();
        manager.set_enabled_dl(false);
        done_video(&manager, "https://host/a", "A");
        manager.enqueue(Video::new("https://host/b", "B")).unwrap();

        let (_, queue) = get_body(&manager, "/video/queue").await;
        insta::assert_snapshot!(queue, @r###"[{"Name":"B","IsDir":false,"Mode":420,"Viewed":false,"URL":"https://host/b","Fail":false}]"###);

        get_body(&manager, "/video/listremoveone?url=https://host/b&path=done").await;
        assert_eq!(manager.queued(), 1);
        get_body(&manager, "/video/listremoveone?url=https://host/b&path=queue").await;
        assert_eq!(manager.queued(), 0);

        let (_, info) = get_body(&manager, "/video/fileinfo?url=https://host/a&viewed=true").await;
        let info: Video = serde_json::from_str(&info).unwrap();
        assert_eq!(info.name, "A");
        assert!(info.viewed && info.is_done());
    }

    #[tokio::test]
    async fn test_add_and_bookmarklet() {
        let Fixture { manager, .. } = fixture();
        manager.set_enabled_dl(false);
        manager.set_quality(crate::format::Quality::BestFound);

        let (status, body) = get_body(&manager, "/video/add/?title=x&url=https%3A%2F%2Fhost%2Fnew").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, CLOSE_WINDOW);
        assert_eq!(manager.history().next().map(|v| v.url.clone()), Some("https://host/new".to_string()));

        let (_, link) = get_body(&manager, "/video/linkadd").await;
        assert!(link.starts_with("javascript:"));
        assert!(link.contains("\"http://localhost:15610/video/add/?title=\""));
    }

    #[tokio::test]
    async fn test_view_file_and_unknown_routes() {
        let Fixture { manager, dir, .. } = fixture();
        manager.set_enabled_dl(false);
        let mut video = Video::new("https://host/v", "Clip");
        video.format = Some(crate::format::Format { extension: "webm".into(), ..Default::default() });
        manager.enqueue(video).unwrap();
        std::fs::create_dir_all(dir.path().join("videos")).unwrap();
        std::fs::write(dir.path().join("videos/Clip.webm"), "webm data").unwrap();

        assert_eq!(get_body(&manager, "/video/viewfile?url=https://host/v").await, (StatusCode::OK, "webm data".to_string()));
        assert_eq!(get_body(&manager, "/video/viewfile?url=https://host/other").await, (StatusCode::OK, String::new()));
        assert_eq!(get_body(&manager, "/video/nothing/here").await, (StatusCode::OK, String::new()));

        let (_, index) = get_body(&manager, "/video/").await;
        assert!(index.contains("<html"));
    }

    #[test]
    fn test_html_escaping() {
        let url = r#"https://host/watch?v=a&list=<"b">'"#;
        let escaped = escape_html(url);
        assert!(!escaped.contains(&['<', '>', '"', '\''][..]));
        assert_eq!(unescape_html(&escaped), url);
        assert_eq!(escape_html("https://host/a/b"), "https://host/a/b");
        assert_eq!(unescape_html("a&amp;b&#34;&#39;&amp;amp;"), r#"a&b"'&amp;"#);
    }
}
