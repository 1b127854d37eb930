//! Progress bars for the `update-*` subcommands.

use std::time::{Duration, Instant};

use citeref_journals::JournalSource;
use indicatif::{HumanBytes, HumanCount, MultiProgress, ProgressBar, ProgressStyle};

const TICK: Duration = Duration::from_millis(120);

struct Styles {
    download: ProgressStyle,
    download_unknown: ProgressStyle,
    spinner: ProgressStyle,
}

impl Styles {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            download: ProgressStyle::with_template(
                "{spinner:.cyan} {msg} [{bar:40.cyan/dim}] {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})",
            )?
            .progress_chars("=> "),
            download_unknown: ProgressStyle::with_template(
                "{spinner:.cyan} {msg} {bytes} ({bytes_per_sec})",
            )?,
            spinner: ProgressStyle::with_template("{spinner:.green} {msg}")?,
        })
    }
}

/// A download bar that switches to a sized bar once the total is known.
fn update_download(bar: &ProgressBar, styles: &Styles, name: &str, downloaded: u64, total: Option<u64>) {
    if let Some(total) = total
        && bar.length() == Some(0)
    {
        bar.set_length(total);
        bar.set_style(styles.download.clone());
    }
    bar.set_position(downloaded);
    bar.set_message(name.to_string());
}

fn finish_download(bar: &ProgressBar) {
    if !bar.is_finished() {
        bar.finish_with_message(format!(
            "Downloaded {} in {:.0?}",
            HumanBytes(bar.position()),
            bar.elapsed()
        ));
    }
}

pub struct LtwaProgress {
    styles: Styles,
    download: ProgressBar,
    parse: ProgressBar,
}

impl LtwaProgress {
    pub fn new(downloading: bool) -> anyhow::Result<Self> {
        let styles = Styles::new()?;
        let multi = MultiProgress::new();

        let download = if downloading {
            let bar = multi.add(ProgressBar::new(0));
            bar.set_style(styles.download_unknown.clone());
            bar.set_message("Connecting to issn.org...");
            bar.enable_steady_tick(TICK);
            bar
        } else {
            ProgressBar::hidden()
        };

        let parse = multi.add(ProgressBar::new(0));
        parse.set_style(styles.spinner.clone());
        parse.set_message("Reading LTWA export...");
        parse.enable_steady_tick(TICK);

        Ok(Self {
            styles,
            download,
            parse,
        })
    }

    pub fn handle(&mut self, event: citeref_ltwa::BuildProgress) {
        use citeref_ltwa::BuildProgress;

        match event {
            BuildProgress::Downloading {
                bytes_downloaded,
                total_bytes,
            } => update_download(&self.download, &self.styles, "LTWA.txt", bytes_downloaded, total_bytes),
            BuildProgress::Parsing { rows } => {
                finish_download(&self.download);
                self.parse
                    .set_message(format!("Folding {} LTWA rows into term tables...", HumanCount(rows)));
            }
            BuildProgress::Complete {
                terms,
                conflicts,
                multi_word_terms,
            } => {
                finish_download(&self.download);
                self.parse.finish_with_message(format!(
                    "Indexed {} terms, {} language conflicts, {} multi-word terms",
                    HumanCount(terms),
                    HumanCount(conflicts),
                    HumanCount(multi_word_terms)
                ));
            }
        }
    }
}

pub struct JournalsProgress {
    styles: Styles,
    multi: MultiProgress,
    medline: Option<ProgressBar>,
    crossref: Option<ProgressBar>,
    parse: ProgressBar,
    started: Instant,
}

impl JournalsProgress {
    pub fn new() -> anyhow::Result<Self> {
        let styles = Styles::new()?;
        let multi = MultiProgress::new();
        let parse = multi.add(ProgressBar::new(0));
        parse.set_style(styles.spinner.clone());
        parse.enable_steady_tick(TICK);
        Ok(Self {
            styles,
            multi,
            medline: None,
            crossref: None,
            parse,
            started: Instant::now(),
        })
    }

    fn download_bar(&mut self, source: JournalSource) -> &ProgressBar {
        let slot = match source {
            JournalSource::Medline => &mut self.medline,
            JournalSource::CrossRef => &mut self.crossref,
        };
        slot.get_or_insert_with(|| {
            let bar = self.multi.insert_before(&self.parse, ProgressBar::new(0));
            bar.set_style(self.styles.download_unknown.clone());
            bar.enable_steady_tick(TICK);
            bar
        })
    }

    fn finish_downloads(&self) {
        for bar in [&self.medline, &self.crossref].into_iter().flatten() {
            finish_download(bar);
        }
    }

    pub fn handle(&mut self, event: citeref_journals::BuildProgress) {
        use citeref_journals::BuildProgress;

        match event {
            BuildProgress::Downloading {
                source,
                bytes_downloaded,
                total_bytes,
            } => {
                let name = format!("{source} journal list");
                let bar = self.download_bar(source).clone();
                update_download(&bar, &self.styles, &name, bytes_downloaded, total_bytes);
            }
            BuildProgress::Parsing {
                source,
                records_parsed,
                issns_inserted,
            } => {
                self.finish_downloads();
                self.parse.set_message(format!(
                    "{source}: {} journals parsed, {} ISSNs indexed",
                    HumanCount(records_parsed),
                    HumanCount(issns_inserted)
                ));
            }
            BuildProgress::Complete {
                medline_issns,
                crossref_issns,
                skipped,
            } => {
                self.finish_downloads();
                if skipped {
                    self.parse
                        .finish_with_message("Journal lists are already up to date (304 Not Modified)");
                } else {
                    self.parse.finish_with_message(format!(
                        "Indexed {} Medline and {} CrossRef ISSNs in {:.0?}",
                        HumanCount(medline_issns),
                        HumanCount(crossref_issns),
                        self.started.elapsed()
                    ));
                }
            }
        }
    }
}
