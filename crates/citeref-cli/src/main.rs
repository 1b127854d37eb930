use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use citeref_journals::{CrossRefJournal, JournalDatabase, MedlineJournal};
use citeref_ltwa::{JournalAbbreviator, LtwaError};
use citeref_pubmed::{FetchOptions, PubMedFetcher};
use serde::Serialize;

mod config_file;
mod output;
mod progress;
mod settings;

use output::ColorMode;
use settings::Settings;

/// Journal reference normalization - ISO-4 title abbreviation, ISSN lookup
/// against Medline/CrossRef, and PubMed record fetches
#[derive(Parser, Debug)]
#[command(name = "citeref", version, about, long_about = None)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log more (-v debug, -vv trace); RUST_LOG applies otherwise
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Abbreviate full journal titles following ISO-4
    Abbreviate {
        /// Journal titles (read one per line from stdin when omitted)
        titles: Vec<String>,

        /// Leave out the period after abbreviated words
        #[arg(long)]
        no_punctuation: bool,

        /// Directory holding the LTWA cache
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Comma-separated languages whose term variants apply
        #[arg(long, value_delimiter = ',', default_value = citeref_ltwa::ENGLISH)]
        languages: Vec<String>,
    },

    /// Download the LTWA export and rebuild the abbreviation cache
    UpdateLtwa {
        /// Directory to store the LTWA cache in
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Download URL of the LTWA export
        #[arg(long)]
        url: Option<String>,

        /// Build from a local copy of the LTWA export instead of downloading
        #[arg(long, conflicts_with = "url")]
        from_file: Option<PathBuf>,
    },

    /// Look up journal titles and abbreviations by ISSN
    Lookup {
        /// ISSNs, with or without hyphen
        #[arg(required = true)]
        issns: Vec<String>,

        /// Path to the journal database
        #[arg(long)]
        db: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Download the Medline and CrossRef journal lists and rebuild the database
    UpdateJournals {
        /// Path to store the journal SQLite database
        #[arg(long)]
        db: Option<PathBuf>,

        /// Local copy of J_Medline.txt
        #[arg(long, requires = "crossref_file")]
        medline_file: Option<PathBuf>,

        /// Local copy of titleFile.csv
        #[arg(long, requires = "medline_file")]
        crossref_file: Option<PathBuf>,
    },

    /// Fetch PubMed records by PMID and print them as JSON
    Pubmed {
        /// PubMed identifiers
        #[arg(required = true)]
        pmids: Vec<String>,

        /// PMIDs per efetch request
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Milliseconds between efetch requests
        #[arg(long)]
        wait_ms: Option<u64>,

        /// Also write the raw efetch XML to this file
        #[arg(long)]
        save_xml: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let color = ColorMode(
        !cli.no_color && std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
    );
    let settings = Settings::from_env(&config_file::load_config());
    tracing::debug!(?settings, "resolved settings");

    match cli.command {
        Command::Abbreviate {
            titles,
            no_punctuation,
            cache_dir,
            languages,
        } => abbreviate(
            titles,
            !no_punctuation,
            &cache_dir.unwrap_or(settings.ltwa_cache_dir),
            languages,
            color,
        ),
        Command::UpdateLtwa {
            cache_dir,
            url,
            from_file,
        } => {
            update_ltwa(
                &cache_dir.unwrap_or(settings.ltwa_cache_dir),
                &url.unwrap_or(settings.ltwa_url),
                from_file.as_deref(),
                color,
            )
            .await
        }
        Command::Lookup { issns, db, json } => {
            lookup(&issns, &db.unwrap_or(settings.journals_db), json, color)
        }
        Command::UpdateJournals {
            db,
            medline_file,
            crossref_file,
        } => {
            let files = medline_file.zip(crossref_file);
            update_journals(&db.unwrap_or_else(|| settings.journals_db.clone()), files, &settings).await
        }
        Command::Pubmed {
            pmids,
            chunk_size,
            wait_ms,
            save_xml,
        } => {
            let options = FetchOptions {
                efetch_url: settings.efetch_url.clone(),
                chunk_size: chunk_size.unwrap_or(settings.pubmed_chunk_size),
                wait: wait_ms.map(Duration::from_millis).unwrap_or(settings.pubmed_wait),
                save_text: save_xml.is_some(),
            };
            pubmed(&pmids, options, save_xml.as_deref(), color).await
        }
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn warn(msg: &str, color: ColorMode) -> anyhow::Result<()> {
    output::print_warning(&mut std::io::stderr().lock(), msg, color)?;
    Ok(())
}

fn abbreviate(
    titles: Vec<String>,
    use_punctuation: bool,
    cache_dir: &Path,
    languages: Vec<String>,
    color: ColorMode,
) -> anyhow::Result<()> {
    let abbreviator = match JournalAbbreviator::from_cache(cache_dir) {
        Ok(abbreviator) => abbreviator.with_languages(languages),
        Err(LtwaError::MissingCache { path }) => bail!(
            "no LTWA cache at {}; run `citeref update-ltwa` first",
            path.display()
        ),
        Err(e) => return Err(e).context("failed to load the LTWA cache"),
    };
    if !abbreviator.tables().is_complete_snapshot() {
        warn(
            "the LTWA cache looks incomplete; abbreviations may be missing",
            color,
        )?;
    }

    let titles = if titles.is_empty() {
        std::io::stdin()
            .lock()
            .lines()
            .map(|line| line.map(|l| l.trim().to_string()))
            .filter(|line| !matches!(line, Ok(l) if l.is_empty()))
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read titles from stdin")?
    } else {
        titles
    };

    let mut out = std::io::stdout().lock();
    for title in &titles {
        let abbreviation = abbreviator.journal_abbreviation(title, use_punctuation);
        output::print_abbreviation(&mut out, title, &abbreviation, color)?;
    }
    out.flush()?;
    Ok(())
}

async fn update_ltwa(
    cache_dir: &Path,
    url: &str,
    from_file: Option<&Path>,
    color: ColorMode,
) -> anyhow::Result<()> {
    let mut bars = progress::LtwaProgress::new(from_file.is_none())?;

    let tables = match from_file {
        Some(path) => citeref_ltwa::build_cache_from_file(cache_dir, path, |e| bars.handle(e))
            .with_context(|| format!("failed to build the LTWA cache from {}", path.display()))?,
        None => citeref_ltwa::build_cache(cache_dir, url, |e| bars.handle(e))
            .await
            .with_context(|| format!("failed to build the LTWA cache from {url}"))?,
    };

    if !tables.is_complete_snapshot() {
        warn(
            "the LTWA export looks truncated; fewer terms than a full snapshot",
            color,
        )?;
    }

    let cache_path = citeref_ltwa::cache_path(cache_dir);
    let canonical = std::fs::canonicalize(&cache_path).unwrap_or(cache_path);
    println!("LTWA cache saved to: {}", canonical.display());
    Ok(())
}

#[derive(Serialize)]
struct LookupRow<'a> {
    issn: &'a str,
    normalized: Option<String>,
    medline: Option<MedlineJournal>,
    crossref: Option<CrossRefJournal>,
}

fn lookup(issns: &[String], db_path: &Path, json: bool, color: ColorMode) -> anyhow::Result<()> {
    if !db_path.exists() {
        bail!(
            "no journal database at {}; run `citeref update-journals` first",
            db_path.display()
        );
    }
    let db = JournalDatabase::open(db_path)
        .with_context(|| format!("failed to open journal database {}", db_path.display()))?;

    if !db.is_populated()? {
        warn(
            "the journal database looks incomplete; rerun `citeref update-journals`",
            color,
        )?;
    }
    let staleness = db.check_staleness(30)?;
    if staleness.is_stale {
        let age = staleness
            .age_days
            .map(|days| format!("{days} days old"))
            .unwrap_or_else(|| "of unknown age".to_string());
        warn(&format!("the journal database is {age}"), color)?;
    }

    let mut rows = Vec::with_capacity(issns.len());
    for issn in issns {
        rows.push(LookupRow {
            issn,
            normalized: citeref_journals::normalize_issn(issn),
            medline: db.medline_record(issn)?,
            crossref: db.crossref_record(issn)?,
        });
    }

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &rows)?;
        writeln!(out)?;
    } else {
        for row in &rows {
            output::print_lookup(
                &mut out,
                row.normalized.as_deref().unwrap_or(row.issn),
                row.medline.as_ref(),
                row.crossref.as_ref(),
                color,
            )?;
        }
    }
    Ok(())
}

async fn update_journals(
    db_path: &Path,
    files: Option<(PathBuf, PathBuf)>,
    settings: &Settings,
) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut bars = progress::JournalsProgress::new()?;
    let updated = match files {
        Some((medline, crossref)) => {
            citeref_journals::build_database_from_files(db_path, &medline, &crossref, |e| {
                bars.handle(e)
            })?;
            true
        }
        None => {
            citeref_journals::build_database(
                db_path,
                &settings.medline_url,
                &settings.crossref_url,
                |e| bars.handle(e),
            )
            .await?
        }
    };

    let canonical = std::fs::canonicalize(db_path).unwrap_or_else(|_| db_path.to_path_buf());
    if !updated {
        println!("Database is already up to date: {}", canonical.display());
    } else {
        println!("Journal database saved to: {}", canonical.display());
    }
    Ok(())
}

async fn pubmed(
    pmids: &[String],
    options: FetchOptions,
    save_xml: Option<&Path>,
    color: ColorMode,
) -> anyhow::Result<()> {
    let fetcher = PubMedFetcher::new(options)?;
    let requested = citeref_pubmed::dedupe_ids(pmids);
    let outcome = fetcher.fetch_list(&requested).await;

    if let Some(path) = save_xml {
        outcome
            .write_raw_xml(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &outcome.articles)?;
    writeln!(out)?;

    if outcome.failed_chunks > 0 {
        warn(
            &format!(
                "{} of {} efetch requests failed",
                outcome.failed_chunks, outcome.chunks
            ),
            color,
        )?;
    }
    let missing = requested
        .iter()
        .filter(|id| !outcome.articles.contains_key(id.as_str()))
        .count();
    if missing > 0 {
        warn(&format!("{missing} PMIDs returned no record"), color)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn abbreviate_defaults_to_english() {
        let cli = Cli::parse_from(["citeref", "abbreviate", "Journal of Physiology"]);
        match cli.command {
            Command::Abbreviate {
                titles,
                no_punctuation,
                languages,
                ..
            } => {
                assert_eq!(titles, ["Journal of Physiology"]);
                assert!(!no_punctuation);
                assert_eq!(languages, ["eng"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["citeref", "lookup", "0022-2836", "--no-color", "-vv"]);
        assert!(cli.no_color);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn journal_files_must_come_together() {
        let result = Cli::try_parse_from([
            "citeref",
            "update-journals",
            "--medline-file",
            "J_Medline.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn from_file_conflicts_with_url() {
        let result = Cli::try_parse_from([
            "citeref",
            "update-ltwa",
            "--url",
            "http://example.org/ltwa.txt",
            "--from-file",
            "LTWA.txt",
        ]);
        assert!(result.is_err());
    }
}
