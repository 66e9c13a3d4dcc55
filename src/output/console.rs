//! Console output utilities.

use console::style;

use crate::media::{AuthorIdentity, MediaItem, MediaType};

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print the application banner.
pub fn print_banner() {
    let banner = r#"
╔═══════════════════════════════════════════════════════╗
║     Pinterest Downloader                              ║
║     Creator feeds and single pins, images and video   ║
╚═══════════════════════════════════════════════════════╝
"#;
    println!("{}", style(banner).cyan());
}

/// Print configuration summary.
pub fn print_config_summary(target: &str, media_type: MediaType, pages: u32, download_dir: &str) {
    println!();
    println!("{}", style("Configuration:").bold());
    println!("  Target: {}", target);
    println!("  Media: {}", media_type.folder_name());
    println!("  Pages: {}", pages);
    println!("  Directory: {}", download_dir);
    println!();
}

/// Print the creator of a feed with its media counts.
pub fn print_author_summary(author: &AuthorIdentity, items: &[MediaItem]) {
    let videos = items.iter().filter(|i| i.video.is_some()).count();
    let images = items.iter().filter(|i| i.image_url.is_some()).count();

    println!("{}", style("-".repeat(35)).dim());
    println!("* {}: {}", style("username").blue(), author.username);
    println!("* {}: {}", style("name").blue(), author.display_name);
    println!("* {}: {}", style("userId").blue(), author.user_id);
    println!("* {}: {}", style("videos").blue(), style(videos).yellow());
    println!("* {}: {}", style("images").blue(), style(images).yellow());
    println!("{}", style("-".repeat(35)).dim());
}

/// Print a single pin's details.
pub fn print_pin_summary(author: &AuthorIdentity, item: &MediaItem) {
    println!("{}", style("-".repeat(35)).dim());
    println!(
        " * {} @{} / {}",
        style("Author:").blue(),
        author.username,
        author.display_name
    );
    println!(" * {} {}", style("Title:").blue(), item.title);
    println!(" * {} {}", style("PinId:").blue(), item.pin_id);
    if let Some(date) = item.upload_date {
        println!(" * {} {}", style("Uploaded:").blue(), date.format("%Y-%m-%d"));
    }
    println!("{}", style("-".repeat(35)).dim());
}
