//! Uploads what is dropped on the icon, and keeps the returned links.

use std::{
    path::Path,
    process::Stdio,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Context, Result};
use applet_runtime::{
    config::{ConfError, ConfGroup, FromKeyFile, KeyFile},
    util::{replace_env_var_references, StringExt},
    AppBase, Applet, Defaults, EmblemPosition, Events, Icon, Menu, Menuer,
};
use async_trait::async_trait;
use dockbus::DockConnection;
use smart_default::SmartDefault;
use tokio::io::AsyncWriteExt;
use uptoshare::{FileType, LinkSet, Uploader, HISTORY_FILE};

const EMBLEM_POSITION: EmblemPosition = EmblemPosition::TopRight;
const EMBLEM_ERROR: &str = "dialog-error";
const ERROR_DIALOG_SECONDS: i32 = 10;
const ICON_HISTORY: &str = "document-open-recent";
const HISTORY_LABEL_MAX: usize = 60;

#[derive(Debug, Clone, PartialEq, SmartDefault)]
pub struct Config {
    pub name: String,

    /// Show the link in a dialog after each upload.
    #[default(true)]
    pub dialog_enabled: bool,
    #[default(5)]
    pub dialog_duration: i32,
    #[default(10)]
    pub upload_history: i32,
    /// KiB/s, 0 for no limit.
    pub upload_rate_limit: u32,
    pub file_for_all: bool,
    #[default("Paste-ubuntu.com".to_string())]
    pub site_text: String,
    #[default("Imgur.com".to_string())]
    pub site_image: String,
    #[default("VideoBin.org".to_string())]
    pub site_video: String,
    #[default("Transfer.sh".to_string())]
    pub site_file: String,
    #[default(true)]
    pub post_anonymous: bool,

    /// Receives the link on its standard input.
    #[default("xclip -selection clipboard".to_string())]
    pub clipboard_command: String,
    pub debug: bool,
}

impl FromKeyFile for Config {
    fn from_key_file(file: &KeyFile, errors: &mut Vec<ConfError>) -> Self {
        let mut conf = Config::default();
        ConfGroup::new(file, "Icon", errors).fill("name", &mut conf.name);

        let mut upload = ConfGroup::new(file, "Upload", errors);
        upload.fill("DialogEnabled", &mut conf.dialog_enabled);
        upload.fill("DialogDuration", &mut conf.dialog_duration);
        upload.fill("UploadHistory", &mut conf.upload_history);
        upload.fill("UploadRateLimit", &mut conf.upload_rate_limit);
        upload.fill("FileForAll", &mut conf.file_for_all);
        upload.fill("SiteText", &mut conf.site_text);
        upload.fill("SiteImage", &mut conf.site_image);
        upload.fill("SiteVideo", &mut conf.site_video);
        upload.fill("SiteFile", &mut conf.site_file);
        upload.fill("PostAnonymous", &mut conf.post_anonymous);

        let mut actions = ConfGroup::new(file, "Actions", errors);
        actions.fill("ClipboardCommand", &mut conf.clipboard_command);
        actions.fill("Debug", &mut conf.debug);
        conf
    }
}

/// Write `text` to the standard input of `command`.
async fn copy_to_clipboard(command: &str, text: &str) -> Result<()> {
    let command = replace_env_var_references(command.to_string());
    let mut args = command.split_whitespace();
    let Some(program) = args.next() else { return Ok(()) };
    let mut child = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to run clipboard command {}", command))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes()).await?;
    }
    child.wait().await?;
    Ok(())
}

/// What the applet does with the result of an upload.
#[derive(Debug, Clone)]
pub struct ResultPolicy {
    icon: Icon,
    dialog_enabled: bool,
    dialog_duration: i32,
    clipboard_command: String,
    emblem_duration: Duration,
}

impl ResultPolicy {
    fn new(icon: Icon) -> Self {
        let conf = Config::default();
        ResultPolicy {
            icon,
            dialog_enabled: conf.dialog_enabled,
            dialog_duration: conf.dialog_duration,
            clipboard_command: conf.clipboard_command,
            emblem_duration: Duration::from_secs(5),
        }
    }

    fn configure(&mut self, conf: &Config) {
        self.dialog_enabled = conf.dialog_enabled;
        self.dialog_duration = conf.dialog_duration;
        self.clipboard_command = conf.clipboard_command.clone();
    }

    /// Copy the link and show it, or show the error with an emblem for a few seconds.
    pub async fn handle(&self, links: LinkSet) {
        if let Some(err) = links.error_message() {
            log::warn!("Upload failed: {}", err);
            applet_runtime::print_result_err!("showing the upload error", self.icon.show_dialog(&format!("Error: {}", err), ERROR_DIALOG_SECONDS).await);
            applet_runtime::print_result_err!("setting the error emblem", self.icon.set_emblem(EMBLEM_ERROR, EMBLEM_POSITION).await);
            let icon = self.icon.clone();
            let duration = self.emblem_duration;
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                applet_runtime::print_result_err!("clearing the error emblem", icon.set_emblem("none", EMBLEM_POSITION).await);
            });
            return;
        }
        let Some(link) = links.link() else { return };
        log::info!("Uploaded {}", link);
        applet_runtime::print_result_err!("copying the link", copy_to_clipboard(&self.clipboard_command, link).await);
        if self.dialog_enabled {
            applet_runtime::print_result_err!("showing the link", self.icon.show_dialog(link, self.dialog_duration).await);
        }
    }
}

/// The menu label of an upload: the uploaded file name, or the link for text.
fn history_label(links: &LinkSet) -> String {
    let file = links.get("file").and_then(|file| Path::new(file).file_name()).map(|name| name.to_string_lossy().into_owned());
    match (file, links.link()) {
        (Some(file), _) => file,
        (None, Some(link)) => link.ellipsize(HISTORY_LABEL_MAX),
        (None, None) => "?".to_string(),
    }
}

pub struct UpToShareApplet {
    base: AppBase,
    conf: Config,
    uploader: Uploader,
    policy: Arc<Mutex<ResultPolicy>>,
}

pub fn new(base: AppBase, _con: &DockConnection) -> Result<Box<dyn Applet>> {
    Ok(Box::new(UpToShareApplet::new(base)))
}

impl UpToShareApplet {
    pub fn new(base: AppBase) -> Self {
        let uploader = Uploader::new(base.files.clone());
        let policy = Arc::new(Mutex::new(ResultPolicy::new(base.icon.clone())));

        let icon = base.icon.clone();
        let busy = base.file_location("icon");
        uploader.set_pre_check(move || {
            let icon = icon.clone();
            let busy = busy.clone();
            async move { applet_runtime::print_result_err!("setting the upload emblem", icon.set_emblem(&busy, EMBLEM_POSITION).await) }
        });
        let icon = base.icon.clone();
        uploader.set_post_check(move || {
            let icon = icon.clone();
            async move { applet_runtime::print_result_err!("clearing the upload emblem", icon.set_emblem("none", EMBLEM_POSITION).await) }
        });
        let on_result = policy.clone();
        uploader.set_on_result(move |links| {
            let policy = on_result.lock().unwrap_or_else(|e| e.into_inner()).clone();
            async move { policy.handle(links).await }
        });

        UpToShareApplet { base, conf: Config::default(), uploader, policy }
    }

    fn apply(&self, conf: &Config) {
        let up = &self.uploader;
        up.set_history_size(conf.upload_history);
        up.set_limit_rate(conf.upload_rate_limit);
        up.set_post_anonymous(conf.post_anonymous);
        up.set_force_file_for_all(conf.file_for_all);
        // The file site first, the others may point to it.
        for (kind, site) in [
            (FileType::File, &conf.site_file),
            (FileType::Text, &conf.site_text),
            (FileType::Image, &conf.site_image),
            (FileType::Video, &conf.site_video),
        ] {
            if let Err(err) = up.set_site(kind, site) {
                log::warn!("Could not set the {} site: {}", kind, err);
            }
        }
        self.policy.lock().unwrap_or_else(|e| e.into_inner()).configure(conf);
    }
}

/// Recent uploads, newest first. Selecting one copies its link again.
fn history_menu(menu: &mut Menu, history: Vec<LinkSet>, clipboard_command: String) {
    if history.is_empty() {
        return;
    }
    let mut sub = menu.add_sub_menu("Upload history", ICON_HISTORY);
    for links in history.iter().rev() {
        let Some(link) = links.link().map(str::to_string) else { continue };
        let command = clipboard_command.clone();
        sub.add_entry(&history_label(links), "", move || {
            let command = command.clone();
            let link = link.clone();
            tokio::spawn(async move { applet_runtime::print_result_err!("copying the link", copy_to_clipboard(&command, &link).await) });
        })
        .set_tooltip(links.link().unwrap_or_default());
    }
}

#[async_trait]
impl Applet for UpToShareApplet {
    fn base(&self) -> &AppBase {
        &self.base
    }

    async fn init(&mut self, load_conf: bool) -> Result<()> {
        if load_conf {
            self.conf = self.base.load_config()?;
        }
        let conf = self.conf.clone();
        let history = self.base.paths.file_data_dir(Path::new("appdata").join(HISTORY_FILE));
        self.uploader.set_history_file(&history).with_context(|| format!("Failed to load the upload history {}", history.display()))?;
        self.apply(&conf);
        self.base.set_defaults(Defaults { label: conf.name, debug: conf.debug, ..Default::default() }).await;
        Ok(())
    }

    fn define_events(&mut self, events: &mut Events) {
        let uploader = self.uploader.clone();
        let history = self.uploader.clone();
        let policy = self.policy.clone();
        events
            .on_drop_data(move |data| {
                let uploader = uploader.clone();
                async move { uploader.upload(data).await }
            })
            .on_build_menu(move |menu| {
                let command = policy.lock().unwrap_or_else(|e| e.into_inner()).clipboard_command.clone();
                history_menu(menu, history.list_history(), command);
            });
    }
}
