//! Interactive terminal menus

use crate::types::{MenuItem, Video};
use crate::utils::display::initials;
use colored::Colorize;
use dialoguer::{Select, theme::ColorfulTheme};

/// Catalog line: title, uploader initials and the link kind
pub fn video_label(video: &Video) -> String {
    let kind = crate::core::source::resolve(&video.video_url).label();
    format!(
        "{} {} {}",
        video.title,
        format!("[{}]", initials(&video.user_id, 2)).dimmed(),
        kind.cyan()
    )
}

pub fn video_menu(videos: Vec<Video>) -> Vec<MenuItem<Video>> {
    videos
        .into_iter()
        .map(|v| MenuItem {
            label: video_label(&v),
            value: v,
        })
        .collect()
}

/// Pick one item. `None` when the list is empty or the user cancels.
pub fn select<T: Clone>(items: &[MenuItem<T>], prompt: &str) -> Option<T> {
    if items.is_empty() {
        return None;
    }

    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact_opt()
        .ok()
        .flatten()?;

    items.get(selection).map(|item| item.value.clone())
}
