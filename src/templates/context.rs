//! Flattens a message into the string map templates are rendered against.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::models::message::NotificationMessage;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub type TemplateContext = HashMap<String, String>;

/// Builds the variable map for `message`.
///
/// Absent payloads contribute no keys, so `{if movie.title}` on a message
/// without a movie is simply false.
pub fn build_context(message: &NotificationMessage) -> TemplateContext {
    let mut ctx = TemplateContext::new();

    ctx.insert("eventType".into(), message.event_type.as_str().into());
    ctx.insert("subject".into(), message.subject.clone());
    ctx.insert("message".into(), message.message.clone());
    ctx.insert(
        "timestamp".into(),
        message.timestamp.format(TIMESTAMP_FORMAT).to_string(),
    );
    ctx.insert("server".into(), message.server_name.clone());
    ctx.insert("serverUrl".into(), message.server_url.clone());
    ctx.insert("isUpgrade".into(), message.is_upgrade.to_string());
    ctx.insert("isTest".into(), message.is_test.to_string());

    insert_opt(&mut ctx, "downloadClient", message.download_client.as_deref());
    insert_opt(&mut ctx, "downloadId", message.download_id.as_deref());
    insert_opt(&mut ctx, "sourceTitle", message.source_title.as_deref());

    if let Some(movie) = &message.movie {
        ctx.insert("movie.id".into(), movie.id.to_string());
        ctx.insert("movie.title".into(), movie.title.clone());
        ctx.insert("movie.year".into(), movie.year.to_string());
        ctx.insert("movie.tmdbId".into(), movie.tmdb_id.to_string());
        ctx.insert("movie.overview".into(), movie.overview.clone());
        ctx.insert("movie.runtime".into(), movie.runtime.to_string());
        ctx.insert("movie.status".into(), movie.status.clone());
        ctx.insert("movie.path".into(), movie.path.clone());
        ctx.insert("movie.monitored".into(), movie.monitored.to_string());
        ctx.insert("movie.hasFile".into(), movie.has_file.to_string());
        insert_opt(&mut ctx, "movie.originalTitle", movie.original_title.as_deref());
        insert_opt(&mut ctx, "movie.imdbId", movie.imdb_id.as_deref());
        insert_opt(&mut ctx, "movie.studio", movie.studio.as_deref());
        insert_opt(&mut ctx, "movie.certification", movie.certification.as_deref());
        insert_list(&mut ctx, "movie.genres", &movie.genres);
    }

    if let Some(file) = &message.movie_file {
        ctx.insert("file.id".into(), file.id.to_string());
        ctx.insert("file.path".into(), file.path.clone());
        ctx.insert("file.relativePath".into(), file.relative_path.clone());
        ctx.insert("file.size".into(), file.size.to_string());
        insert_opt(&mut ctx, "file.releaseGroup", file.release_group.as_deref());
        insert_opt(&mut ctx, "file.edition", file.edition.as_deref());
        if let Some(date_added) = file.date_added {
            ctx.insert(
                "file.dateAdded".into(),
                date_added.format(TIMESTAMP_FORMAT).to_string(),
            );
        }
    }

    if let Some(quality) = &message.quality {
        ctx.insert("quality.name".into(), quality.name.clone());
        ctx.insert("quality.resolution".into(), quality.resolution.to_string());
        ctx.insert("quality.source".into(), quality.source.clone());
        ctx.insert("quality.revision".into(), quality.revision.to_string());
    }

    if let Some(health) = &message.health {
        ctx.insert("health.type".into(), health.check_type.clone());
        ctx.insert("health.source".into(), health.source.clone());
        ctx.insert("health.level".into(), health.level.as_str().into());
        ctx.insert("health.message".into(), health.message.clone());
        insert_opt(&mut ctx, "health.wikiUrl", health.wiki_url.as_deref());
    }

    if let Some(update) = &message.update {
        ctx.insert("update.previousVersion".into(), update.previous_version.clone());
        ctx.insert("update.newVersion".into(), update.new_version.clone());
        ctx.insert("update.message".into(), update.message.clone());
    }

    if let Some(release) = &message.release {
        ctx.insert("release.title".into(), release.title.clone());
        ctx.insert("release.indexer".into(), release.indexer.clone());
        ctx.insert("release.size".into(), release.size.to_string());
        insert_opt(&mut ctx, "release.releaseGroup", release.release_group.as_deref());
        insert_opt(&mut ctx, "release.protocol", release.protocol.as_deref());
    }

    if let Some(rename) = &message.rename {
        ctx.insert("rename.previousPath".into(), rename.previous_path.clone());
        ctx.insert("rename.newPath".into(), rename.new_path.clone());
    }

    for (key, value) in &message.data {
        ctx.insert(format!("data.{}", key), stringify(value));
    }

    ctx
}

fn insert_opt(ctx: &mut TemplateContext, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        ctx.insert(key.to_string(), value.to_string());
    }
}

fn insert_list(ctx: &mut TemplateContext, key: &str, values: &[String]) {
    if !values.is_empty() {
        ctx.insert(key.to_string(), values.join(", "));
    }
}

fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(", "),
        JsonValue::Object(_) => value.to_string(),
    }
}
