//! Catalog of template variables, for documentation and editors.
//! The renderer never consults it.

use std::collections::BTreeMap;

use crate::models::event::EventType;

const COMMON: &[(&str, &str)] = &[
    ("{eventType}", "Event type identifier, e.g. grab"),
    ("{subject}", "Default subject for the event"),
    ("{message}", "Default message text for the event"),
    ("{timestamp}", "Event time as YYYY-MM-DD HH:MM:SS (UTC)"),
    ("{server}", "Server name"),
    ("{serverUrl}", "Server base URL"),
    ("{isTest}", "true when sent as a test notification"),
    ("{data.<key>}", "Additional event-specific value"),
];

const MOVIE: &[(&str, &str)] = &[
    ("{movie.id}", "Movie ID"),
    ("{movie.title}", "Movie title"),
    ("{movie.originalTitle}", "Original title"),
    ("{movie.year}", "Release year"),
    ("{movie.tmdbId}", "TMDb ID"),
    ("{movie.imdbId}", "IMDb ID"),
    ("{movie.overview}", "Plot overview"),
    ("{movie.runtime}", "Runtime in minutes"),
    ("{movie.genres}", "Comma separated genres"),
    ("{movie.status}", "Release status"),
    ("{movie.path}", "Movie folder"),
    ("{movie.monitored}", "Whether the movie is monitored"),
    ("{movie.hasFile}", "Whether a file is present"),
    ("{movie.studio}", "Studio"),
    ("{movie.certification}", "Certification"),
];

const FILE: &[(&str, &str)] = &[
    ("{file.id}", "Movie file ID"),
    ("{file.path}", "Full file path"),
    ("{file.relativePath}", "Path relative to the movie folder"),
    ("{file.size}", "File size in bytes"),
    ("{file.releaseGroup}", "Release group of the file"),
    ("{file.edition}", "Edition"),
    ("{file.dateAdded}", "When the file was imported"),
    ("{quality.name}", "Quality name"),
    ("{quality.resolution}", "Vertical resolution"),
    ("{quality.source}", "Quality source"),
    ("{quality.revision}", "Quality revision"),
];

const DOWNLOAD: &[(&str, &str)] = &[
    ("{downloadClient}", "Download client name"),
    ("{downloadId}", "Download client item ID"),
    ("{sourceTitle}", "Release title as grabbed"),
    ("{isUpgrade}", "true when replacing an existing file"),
];

const GRAB: &[(&str, &str)] = &[
    ("{release.title}", "Release title"),
    ("{release.indexer}", "Indexer the release came from"),
    ("{release.releaseGroup}", "Release group"),
    ("{release.size}", "Release size in bytes"),
    ("{release.protocol}", "Download protocol"),
];

const RENAME: &[(&str, &str)] = &[
    ("{rename.previousPath}", "Path before renaming"),
    ("{rename.newPath}", "Path after renaming"),
];

const HEALTH: &[(&str, &str)] = &[
    ("{health.type}", "Health check type"),
    ("{health.source}", "Health check source"),
    ("{health.level}", "ok, notice, warning or error"),
    ("{health.message}", "Health check message"),
    ("{health.wikiUrl}", "Link to troubleshooting docs"),
];

const UPDATE: &[(&str, &str)] = &[
    ("{update.previousVersion}", "Version before the update"),
    ("{update.newVersion}", "Version after the update"),
    ("{update.message}", "Update message"),
];

pub fn available_variables(event_type: EventType) -> BTreeMap<String, String> {
    let mut groups: Vec<&[(&str, &str)]> = vec![COMMON];

    match event_type {
        EventType::Grab => groups.extend([MOVIE, FILE, DOWNLOAD, GRAB]),
        EventType::Download | EventType::Upgrade => groups.extend([MOVIE, FILE, DOWNLOAD]),
        EventType::Rename => groups.extend([MOVIE, FILE, RENAME]),
        EventType::MovieAdded | EventType::MovieDelete => groups.push(MOVIE),
        EventType::MovieFileDelete => groups.extend([MOVIE, FILE]),
        EventType::Health => groups.push(HEALTH),
        EventType::ApplicationUpdate => groups.push(UPDATE),
        EventType::Test => groups.push(MOVIE),
    }

    groups
        .into_iter()
        .flatten()
        .map(|(placeholder, description)| (placeholder.to_string(), description.to_string()))
        .collect()
}
