//! The hosting sites, and how to read their answers.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;

use crate::{
    links::LinkSet,
    parse::{find_link, find_prefix},
    poster::{Endpoint, Payload, PostConfig, Poster},
};

/// What an upload is, and so which kind of site it goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum FileType {
    Text,
    Image,
    Video,
    File,
}

/// One upload destination.
#[async_trait]
pub trait Sender: Send + Sync {
    fn name(&self) -> &str;

    /// Upload the payload. Failures are returned as an error link set, an empty set means the site answered nothing.
    async fn send(&self, client: &Client, config: &PostConfig, payload: &Payload) -> LinkSet;
}

/// A site reached with one of the [`Poster`] shapes, with the extractor of its answer.
pub struct Host {
    pub name: String,
    pub poster: Poster,
    pub parse: fn(&Host, &str) -> LinkSet,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host").field("name", &self.name).field("poster", &self.poster).finish_non_exhaustive()
    }
}

impl Host {
    pub fn new(name: impl Into<String>, poster: Poster, parse: fn(&Host, &str) -> LinkSet) -> Self {
        Host { name: name.into(), poster, parse }
    }

    /// The base url of the site.
    pub fn url(&self) -> String {
        self.poster.endpoint().url("")
    }

    fn parse_failed(&self) -> LinkSet {
        LinkSet::error(format!("{}: parse failed", self.name))
    }
}

#[async_trait]
impl Sender for Host {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, client: &Client, config: &PostConfig, payload: &Payload) -> LinkSet {
        match self.poster.post(client, config, payload).await {
            Err(err) => LinkSet::failed(&self.name, err),
            Ok(answer) if answer.trim().is_empty() => LinkSet::new(),
            Ok(answer) => {
                log::debug!("{} answered: {}", self.name, answer);
                (self.parse)(self, &answer)
            }
        }
    }
}

pub const TEXT_SITES: &[&str] = &["Codepad.org", "Pastebin.com", "Pastebin.mozilla.org", "Paste-ubuntu.com", "Play.golang.org"];
pub const IMAGE_SITES: &[&str] = &["Imagebam.com", "Imagebin.ca", "ImageShack.us", "Imgclick.net", "Imgland.net", "Imgur.com", "Postimage.org"];
pub const VIDEO_SITES: &[&str] = &["VideoBin.org"];
pub const FILE_SITES: &[&str] = &["Filebin.ca", "Freemov.top", "Leopard.hosting", "Pixeldra.in", "Transfer.sh"];

pub fn site_names(kind: FileType) -> &'static [&'static str] {
    match kind {
        FileType::Text => TEXT_SITES,
        FileType::Image => IMAGE_SITES,
        FileType::Video => VIDEO_SITES,
        FileType::File => FILE_SITES,
    }
}

/// The site called `name` among the sites for `kind`.
pub fn site(kind: FileType, name: &str) -> Option<Host> {
    if !site_names(kind).contains(&name) {
        return None;
    }
    let (poster, parse): (Poster, fn(&Host, &str) -> LinkSet) = match name {
        "Codepad.org" => (Poster::form("http://codepad.org/", "code", &[("lang", "Plain Text"), ("submit", "Submit")]), parse_codepad),
        "Pastebin.com" => (
            Poster::form(
                "http://pastebin.com/api/api_post.php",
                "api_paste_code",
                &[
                    ("api_option", "paste"),
                    ("api_paste_private", "1"),
                    ("api_paste_expire_date", "1M"),
                    ("api_paste_format", "text"),
                    ("api_dev_key", "4dacb211338b25bfad20bc6d4358e555"),
                    ("api_user_key", ""),
                ],
            )
            .with_user_field("api_paste_name", ""),
            parse_pastebin,
        ),
        "Pastebin.mozilla.org" => (
            Poster::form(
                "https://pastebin.mozilla.org",
                "code2",
                &[("format", "text"), ("paste", "Send"), ("expiry", "d"), ("remember", "0"), ("parent_pid", "")],
            )
            .with_user_field("poster", "Anonymous"),
            parse_mozilla,
        ),
        "Paste-ubuntu.com" => (
            Poster::form("http://paste.ubuntu.com", "content", &[("syntax", "text"), ("submit", "Paste!")]).with_user_field("poster", "Anonymous"),
            parse_ubuntu,
        ),
        "Play.golang.org" => (Poster::raw(Method::POST, Endpoint::Fixed("https://play.golang.org/share".into())), |_, answer| {
            LinkSet::found(format!("https://play.golang.org/p/{}", answer.trim()))
        }),

        "Imagebam.com" => (
            Poster::multipart(
                "http://www.imagebam.com/sys/upload/save",
                "file[]",
                &[("content_type", "1"), ("thumb_size", "250"), ("thumb_aspect_ratio", "resize"), ("thumb_file_type", "jpg")],
            ),
            |_, answer| {
                LinkSet::found(find_prefix(answer, "[URL=", "][IMG]").unwrap_or_default())
                    .add("del", find_link(answer, "http://www.imagebam.com/remove/", "'></div>").unwrap_or_default())
            },
        ),
        "Imagebin.ca" => (Poster::multipart("https://imagebin.ca/upload.php", "file", &[("private", "true")]), |host, answer| {
            match find_prefix(answer, "url:", "\n") {
                Some(link) => LinkSet::found(link).add("page", link.replacen("http://ibin.co/", "http://imagebin.ca/v/", 1)),
                None => host.parse_failed(),
            }
        }),
        "ImageShack.us" => (
            Poster::multipart(
                "http://imageshack.us/upload_api.php",
                "fileupload",
                &[("key", "ABDGHOQS7d32e206ee33ef8cefb208d55dd030a6"), ("public", "no"), ("xml", "yes")],
            ),
            |_, answer| {
                LinkSet::found(find_prefix(answer, "<image_link>", "</image_link>").unwrap_or_default())
                    .add("thumb", find_prefix(answer, "<thumb_link>", "</thumb_link>").unwrap_or_default())
            },
        ),
        "Imgclick.net" => (
            Poster::multipart("http://main.imgclick.net/cgi-bin/upload_file.cgi?upload_id=", "file_0", &[("upload_type", "file")]),
            |_, answer| LinkSet::found(find_link(answer, "http://main.imgclick.net/i/", "[/IMG][/URL]").unwrap_or_default()),
        ),
        "Imgland.net" => (Poster::multipart("https://imgland.net/process.php?subAPI=mainsite", "imagefile[]", &[("usubmit", "true")]), |host, answer| {
            #[derive(Deserialize)]
            struct Answer {
                url: String,
            }
            match serde_json::from_str::<Answer>(answer) {
                Ok(answer) => LinkSet::found(answer.url),
                Err(err) => LinkSet::failed(&host.name, err),
            }
        }),
        "Imgur.com" => (Poster::multipart("http://imgur.com/api/upload.xml", "image", &[("key", "b3625162d3418ac51a9ee805b1840452")]), |_, answer| {
            let tag = |name: &str| find_prefix(answer, &format!("<{}>", name), &format!("</{}>", name)).unwrap_or_default().to_string();
            LinkSet::found(tag("original_image"))
                .add("thumb", tag("small_thumbnail"))
                .add("large", tag("large_thumbnail"))
                .add("page", tag("imgur_page"))
                .add("del", tag("delete_page"))
        }),
        "Postimage.org" => (Poster::multipart("https://old.postimage.org/", "upload[]", &[("adult", "no")]), |_, answer| {
            LinkSet::found(find_link(answer, "http://postimg.org/image/", "' ").unwrap_or_default())
                .add("thumb", find_prefix(answer, "[img]", "[/img]").unwrap_or_default())
                .add("del", find_link(answer, "http://postimg.org/delete/", "<").unwrap_or_default())
        }),

        "VideoBin.org" => (Poster::multipart("https://videobin.org/add", "videoFile", &[("api", "1")]), |_, answer| LinkSet::found(answer)),

        "Filebin.ca" => (Poster::multipart("http://filebin.ca/upload.php", "file", &[]), |host, answer| match find_prefix(answer, "url:", "\n") {
            Some(link) => LinkSet::found(link).add("page", link.replacen("http://ibin.co/", "http://filebin.ca/v/", 1)),
            None => host.parse_failed(),
        }),
        "Freemov.top" => (Poster::multipart("http://freemov.top/", "upload[]", &[("submit", "submit")]), |host, answer| {
            match find_prefix(answer, r#"id="name" value="#, " />") {
                Some(link) => LinkSet::found(format!("http://{}", link.trim_matches('"'))),
                None => LinkSet::error(format!("{}: bad format", host.name)),
            }
        }),
        "Leopard.hosting" => (
            Poster::multipart(
                "http://leopard.hosting/upload.php",
                "uploadContent",
                &[("public", "no"), ("showname", "no"), ("json", "true")],
            ),
            parse_leopard,
        ),
        "Pixeldra.in" => (
            Poster::multipart("http://pixeldra.in/api/upload", "file", &[]).with_file_fields(|name| vec![("fileName", name.to_string())]),
            |host, answer| {
                #[derive(Deserialize)]
                struct Answer {
                    id: String,
                    url: String,
                }
                match serde_json::from_str::<Answer>(answer) {
                    Ok(answer) => LinkSet::found(answer.url).add("del", answer.id),
                    Err(err) => LinkSet::failed(&host.name, err),
                }
            },
        ),
        "Transfer.sh" => (Poster::raw(Method::PUT, Endpoint::PerFile(|name| format!("https://transfer.sh/{}", name))), |host, answer| {
            match answer.trim() {
                "Not Found" => LinkSet::error(format!("{} has answered: Not Found", host.name)),
                link => LinkSet::found(link),
            }
        }),
        _ => return None,
    };
    Some(Host::new(name, poster, parse))
}

fn parse_codepad(host: &Host, answer: &str) -> LinkSet {
    match find_link(answer, &host.url(), "\"") {
        Some(link) => LinkSet::found(link).add("dl", format!("{}/raw.txt", link)).add("fork", format!("{}/fork", link)),
        None => host.parse_failed(),
    }
}

fn parse_pastebin(host: &Host, answer: &str) -> LinkSet {
    if answer.starts_with("http://") || answer.starts_with("https://") {
        LinkSet::found(answer)
    } else {
        LinkSet::error(format!("{}: bad format: {}", host.name, answer))
    }
}

fn parse_mozilla(host: &Host, answer: &str) -> LinkSet {
    match find_link(answer, "/?dl=", "\"") {
        Some(id) => {
            let url = host.url();
            LinkSet::found(format!("{}{}", url, id)).add("dl", format!("{}/{}", url, &id["/?dl=".len()..]))
        }
        None => host.parse_failed(),
    }
}

fn parse_ubuntu(host: &Host, answer: &str) -> LinkSet {
    match find_prefix(answer, r#"class="pturl" href="/"#, "/plain/") {
        Some(id) => LinkSet::found(format!("{}/{}", host.url(), id)),
        None => host.parse_failed(),
    }
}

fn parse_leopard(host: &Host, answer: &str) -> LinkSet {
    #[derive(Deserialize)]
    struct Answer {
        upload: Upload,
    }
    #[derive(Deserialize)]
    struct Upload {
        #[serde(default)]
        support: String,
        #[serde(rename = "downloadURL")]
        download_url: String,
        #[serde(rename = "fileCode", default)]
        file_code: String,
        #[serde(rename = "deleteURL", default)]
        delete_url: String,
    }
    match serde_json::from_str::<Answer>(answer) {
        Ok(Answer { upload }) => LinkSet::found(upload.download_url)
            .add("del", upload.delete_url)
            .add("support", upload.support)
            .add("ID", upload.file_code),
        Err(err) => LinkSet::failed(&host.name, err),
    }
}
