//! Built-in post-processing stages.

mod convert_str_int;
mod image_size;
mod merge;
mod mime_detect;
mod resolve_href;
mod set_autoplay;
mod ssl_force;

pub use convert_str_int::ConvertStrIntStage;
pub use image_size::{ImageSizeStage, IMAGE_SIZE_TTL};
pub use merge::MergeStage;
pub use mime_detect::MimeDetectStage;
pub use resolve_href::ResolveHrefStage;
pub use set_autoplay::SetAutoplayStage;
pub use ssl_force::SslForceStage;

/// Extension (with the dot, case preserved) of the href's path, ignoring
/// query and fragment. Works for relative hrefs too.
pub(crate) fn path_extension(href: &str) -> Option<String> {
    let path = match url::Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => href
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let file_name = path.rsplit('/').next()?;
    let dot = file_name.rfind('.')?;
    if dot == 0 {
        return None;
    }
    Some(file_name[dot..].to_string())
}
