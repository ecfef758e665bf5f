//! Built-in templates, one per event type.
//!
//! Built once on first use and never mutated; per-notification overrides live
//! on `NotificationConfig::templates`.

use std::{collections::HashMap, sync::LazyLock};

use crate::models::{event::EventType, template::NotificationTemplate};

static DEFAULT_TEMPLATES: LazyLock<HashMap<EventType, NotificationTemplate>> =
    LazyLock::new(|| {
        EventType::ALL
            .into_iter()
            .map(|event_type| (event_type, build(event_type)))
            .collect()
    });

pub fn default_template(event_type: EventType) -> &'static NotificationTemplate {
    // Every variant is inserted at initialisation.
    &DEFAULT_TEMPLATES[&event_type]
}

pub fn default_templates() -> &'static HashMap<EventType, NotificationTemplate> {
    &DEFAULT_TEMPLATES
}

/// Custom override when present, the built-in template otherwise.
pub fn resolve_template<'a>(
    event_type: EventType,
    custom: &'a HashMap<EventType, NotificationTemplate>,
) -> &'a NotificationTemplate {
    custom
        .get(&event_type)
        .unwrap_or_else(|| default_template(event_type))
}

fn build(event_type: EventType) -> NotificationTemplate {
    let (subject, body, html) = match event_type {
        EventType::Grab => (
            "[{server}] Grabbed: {movie.title} ({movie.year})",
            "{movie.title} ({movie.year}) was grabbed.\n\
             Release: {release.title}\n\
             {if quality.name}Quality: {quality.name}\n{/if}\
             {if release.indexer}Indexer: {release.indexer}\n{/if}\
             {if release.releaseGroup}Group: {release.releaseGroup}\n{/if}\
             {if downloadClient}Client: {downloadClient}\n{/if}",
            "<h3>{movie.title} ({movie.year})</h3>\
             <p>Grabbed <b>{release.title}</b>{if quality.name} in {quality.name}{/if}\
             {if release.indexer} from {release.indexer}{/if}.</p>",
        ),
        EventType::Download => (
            "[{server}] Downloaded: {movie.title} ({movie.year})",
            "{movie.title} ({movie.year}) has been imported.\n\
             {if quality.name}Quality: {quality.name}\n{/if}\
             {if file.relativePath}File: {file.relativePath}\n{/if}\
             {if movie.genres}Genres: {foreach movie.genres}{item}, {/foreach}\n{/if}\
             {if movie.overview}\n{movie.overview}{/if}",
            "<h3>{movie.title} ({movie.year})</h3>\
             <p>Imported{if quality.name} in {quality.name}{/if}.</p>\
             {if movie.overview}<p>{movie.overview}</p>{/if}",
        ),
        EventType::Upgrade => (
            "[{server}] Upgraded: {movie.title} ({movie.year})",
            "{movie.title} ({movie.year}) was upgraded.\n\
             {if quality.name}New quality: {quality.name}\n{/if}\
             {if file.relativePath}File: {file.relativePath}\n{/if}",
            "<h3>{movie.title} ({movie.year})</h3>\
             <p>Upgraded{if quality.name} to {quality.name}{/if}.</p>",
        ),
        EventType::Rename => (
            "[{server}] Renamed: {movie.title} ({movie.year})",
            "Files for {movie.title} ({movie.year}) were renamed.\n\
             {if rename.previousPath}From: {rename.previousPath}\n{/if}\
             {if rename.newPath}To: {rename.newPath}\n{/if}",
            "<h3>{movie.title} ({movie.year})</h3><p>Files renamed.</p>",
        ),
        EventType::MovieAdded => (
            "[{server}] Added: {movie.title} ({movie.year})",
            "{movie.title} ({movie.year}) was added to the library.\n\
             {if movie.genres}Genres: {foreach movie.genres}{item}, {/foreach}\n{/if}\
             {if movie.overview}\n{movie.overview}{/if}",
            "<h3>{movie.title} ({movie.year})</h3><p>Added to the library.</p>\
             {if movie.overview}<p>{movie.overview}</p>{/if}",
        ),
        EventType::MovieDelete => (
            "[{server}] Deleted: {movie.title} ({movie.year})",
            "{movie.title} ({movie.year}) was removed from the library.\n\
             {if movie.path}Path: {movie.path}\n{/if}",
            "<h3>{movie.title} ({movie.year})</h3><p>Removed from the library.</p>",
        ),
        EventType::MovieFileDelete => (
            "[{server}] File deleted: {movie.title} ({movie.year})",
            "A file for {movie.title} ({movie.year}) was deleted.\n\
             {if file.relativePath}File: {file.relativePath}\n{/if}\
             {if data.reason}Reason: {data.reason}\n{/if}",
            "<h3>{movie.title} ({movie.year})</h3>\
             <p>Deleted {file.relativePath}{if data.reason} ({data.reason}){/if}.</p>",
        ),
        EventType::Health => (
            "[{server}] Health {health.level}: {health.source}",
            "{health.message}\n{if health.wikiUrl}More info: {health.wikiUrl}\n{/if}",
            "<p><b>{health.source}</b>: {health.message}</p>\
             {if health.wikiUrl}<p><a href=\"{health.wikiUrl}\">More info</a></p>{/if}",
        ),
        EventType::ApplicationUpdate => (
            "[{server}] Updated to {update.newVersion}",
            "{server} was updated from {update.previousVersion} to {update.newVersion}.\n\
             {if update.message}{update.message}\n{/if}",
            "<p>Updated from {update.previousVersion} to <b>{update.newVersion}</b>.</p>",
        ),
        EventType::Test => (
            "[{server}] Test notification",
            "This is a test notification sent at {timestamp}.\n\
             {if serverUrl}Server: {serverUrl}\n{/if}",
            "<p>This is a test notification sent at {timestamp}.</p>",
        ),
    };

    NotificationTemplate::new(format!("default-{}", event_type), event_type, subject, body)
        .with_body_html(html)
        .with_defaults(event_type.title(), "{message}")
}
