//! convert-str-int: coerce `width`, `height` and `duration` to numbers and
//! drop bad values.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::EmbedError;
use crate::pipeline::{Environment, Stage, StageMetadata};
use crate::types::{Media, MediaValue};

/// Leading decimal literal, the way `parseFloat` reads it.
static FLOAT_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?").unwrap());

pub struct ConvertStrIntStage;

impl ConvertStrIntStage {
    pub const ID: &'static str = "convert-str-int";
}

#[async_trait]
impl Stage for ConvertStrIntStage {
    fn metadata(&self) -> StageMetadata {
        StageMetadata {
            id: Self::ID,
            description: "Convert media sizes and duration to positive numbers",
            priority: 0,
        }
    }

    async fn run(&self, env: &mut Environment<'_>) -> Result<(), EmbedError> {
        for snippet in &mut env.result.snippets {
            normalize_media(&mut snippet.media);
        }
        Ok(())
    }
}

fn normalize_media(media: &mut Media) {
    for field in [&mut media.width, &mut media.height, &mut media.duration] {
        *field = field
            .take()
            .and_then(|value| coerce(&value))
            .map(MediaValue::Number);
    }

    // width and height only make sense together
    if media.width.is_none() || media.height.is_none() {
        media.width = None;
        media.height = None;
    }
}

fn coerce(value: &MediaValue) -> Option<f64> {
    let number = match value {
        MediaValue::Number(n) => *n,
        MediaValue::Text(s) => parse_float(s)?,
        MediaValue::Other(_) => return None,
    };

    (number.is_finite() && number > 0.0).then_some(number)
}

fn parse_float(s: &str) -> Option<f64> {
    let prefix = FLOAT_PREFIX_RE.find(s.trim_start())?;
    prefix.as_str().parse().ok()
}
