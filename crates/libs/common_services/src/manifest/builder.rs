//! Builds the `SampleList.csv` manifest the uploader tool reads to find samples.

use crate::manifest::ManifestError;
use crate::irida_client::ProjectResolver;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{info, warn};
use walkdir::WalkDir;

pub const MANIFEST_SECTION: &str = "[Data]";
pub const MANIFEST_HEADER: &str = "Sample_Name,Project_ID,File_Forward,File_Reverse";

const READ_SUFFIX: &str = ".fastq.gz";
const NON_HOST_FORWARD: &str = "_1.non_host.fastq.gz";
const NON_HOST_REVERSE: &str = "_2.non_host.fastq.gz";

static PAIRED_SAMPLE_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_S[0-9]{1,3}|_R[12].|_1.non_host.fastq.gz|_2.non_host.fastq.gz")
        .expect("Invalid paired sample regex")
});
static SINGLE_SAMPLE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".fastq|.fq.").expect("Invalid single-end sample regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadLayout {
    Paired,
    SingleEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleManifestEntry {
    pub sample_id: String,
    pub forward_file: String,
    pub reverse_file: Option<String>,
}

/// How to build a manifest. Unset fields are derived from the folder.
#[derive(Debug, Clone, Default)]
pub struct ManifestOptions {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    /// `None` auto-detects from the file names.
    pub paired_end: Option<bool>,
    pub sort: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedManifest {
    pub path: PathBuf,
    pub project_id: String,
    pub sample_count: usize,
}

/// A manifest that was already on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingManifest {
    /// Project id of the first data row, if there is one.
    pub project_id: Option<String>,
    pub entries: Vec<SampleManifestEntry>,
}

fn is_read_file(name: &str) -> bool {
    name.ends_with(READ_SUFFIX)
}

fn is_forward_read(name: &str) -> bool {
    is_read_file(name) && name.contains("_R1")
}

fn is_reverse_read(name: &str) -> bool {
    name.contains("_R2") || name.ends_with(NON_HOST_REVERSE)
}

/// Paired when any file looks like an `_R1` forward read.
#[must_use]
pub fn detect_layout(file_names: &[String]) -> ReadLayout {
    if file_names.iter().any(|n| is_forward_read(n)) {
        ReadLayout::Paired
    } else {
        ReadLayout::SingleEnd
    }
}

/// Strips the lane/read tokens from a read file name.
#[must_use]
pub fn sample_id(file_name: &str, layout: ReadLayout) -> String {
    let regex = match layout {
        ReadLayout::Paired => &PAIRED_SAMPLE_SPLIT,
        ReadLayout::SingleEnd => &SINGLE_SAMPLE_SPLIT,
    };
    regex
        .split(file_name)
        .next()
        .unwrap_or(file_name)
        .to_owned()
}

/// Name of the reverse mate of a forward read.
///
/// # Errors
///
/// `ManifestError::InvalidFileName` if the name carries neither an `_R1` token nor the
/// non-host forward suffix.
pub fn reverse_file_name(forward: &str) -> Result<String, ManifestError> {
    if forward.contains("_R1") {
        Ok(forward.replace("_R1", "_R2"))
    } else if let Some(stem) = forward.strip_suffix(NON_HOST_FORWARD) {
        Ok(format!("{stem}{NON_HOST_REVERSE}"))
    } else {
        Err(ManifestError::InvalidFileName(forward.to_owned()))
    }
}

/// File names of everything below `directory`, in enumeration order.
fn read_file_names(directory: &Path) -> Result<Vec<String>, ManifestError> {
    let mut names = Vec::new();
    for entry in WalkDir::new(directory) {
        let entry = entry?;
        if entry.file_type().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Scans `directory` and pairs up its read files.
///
/// # Errors
///
/// Fails if the folder can't be walked, or a forward read has no derivable mate.
pub fn collect_entries(
    directory: &Path,
    paired_end: Option<bool>,
    sort: bool,
) -> Result<Vec<SampleManifestEntry>, ManifestError> {
    let mut names = read_file_names(directory)?;
    if sort {
        names.sort();
    }

    let layout = match paired_end {
        Some(true) => ReadLayout::Paired,
        Some(false) => ReadLayout::SingleEnd,
        None => detect_layout(&names),
    };

    let forwards: Vec<&String> = match (layout, paired_end) {
        // Forced pairing: everything that isn't a reverse read must be a forward read.
        (ReadLayout::Paired, Some(true)) => names
            .iter()
            .filter(|n| is_read_file(n) && !is_reverse_read(n))
            .collect(),
        (ReadLayout::Paired, _) => names.iter().filter(|n| is_forward_read(n)).collect(),
        (ReadLayout::SingleEnd, _) => names
            .iter()
            .filter(|n| is_read_file(n) && !n.contains("_R1") && !n.contains("_R2"))
            .collect(),
    };

    let present: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut entries = Vec::with_capacity(forwards.len());
    for forward in forwards {
        let reverse_file = match layout {
            ReadLayout::Paired => {
                let reverse = reverse_file_name(forward)?;
                if !present.contains(reverse.as_str()) {
                    warn!("Reverse read {reverse} for {forward} is missing.");
                }
                Some(reverse)
            }
            ReadLayout::SingleEnd => None,
        };
        entries.push(SampleManifestEntry {
            sample_id: sample_id(forward, layout),
            forward_file: forward.clone(),
            reverse_file,
        });
    }

    Ok(entries)
}

#[must_use]
pub fn render_manifest(project_id: &str, entries: &[SampleManifestEntry]) -> String {
    let mut out = format!("{MANIFEST_SECTION}\n{MANIFEST_HEADER}\n");
    for entry in entries {
        let reverse = entry.reverse_file.as_deref().unwrap_or_default();
        out.push_str(&format!(
            "{}, {project_id}, {}, {reverse}\n",
            entry.sample_id, entry.forward_file
        ));
    }
    out
}

/// Reads a manifest from disk. `Ok(None)` if there is none.
///
/// # Errors
///
/// Fails when the file can't be read or doesn't start with the manifest header.
pub fn read_manifest(path: &Path) -> Result<Option<ExistingManifest>, ManifestError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let malformed = |reason: &str| ManifestError::Malformed {
        path: path.to_path_buf(),
        reason: reason.to_owned(),
    };

    let mut lines = content.lines();
    if lines.next().map(str::trim) != Some(MANIFEST_SECTION) {
        return Err(malformed("missing [Data] section"));
    }
    if lines.next().map(str::trim) != Some(MANIFEST_HEADER) {
        return Err(malformed("missing column header"));
    }

    let mut project_id = None;
    let mut entries = Vec::new();
    for line in lines.filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let [sample, project, forward, rest @ ..] = fields.as_slice() else {
            return Err(malformed("row has fewer than three columns"));
        };
        if project_id.is_none() && !project.is_empty() {
            project_id = Some((*project).to_owned());
        }
        let reverse_file = rest
            .first()
            .filter(|r| !r.is_empty())
            .map(|r| (*r).to_owned());
        entries.push(SampleManifestEntry {
            sample_id: (*sample).to_owned(),
            forward_file: (*forward).to_owned(),
            reverse_file,
        });
    }

    Ok(Some(ExistingManifest {
        project_id,
        entries,
    }))
}

/// `<prefix>-<folder name with '_' as '-'>-<yymmdd>`.
#[must_use]
pub fn default_project_name(prefix: &str, directory: &Path, date: NaiveDate) -> String {
    let folder = directory
        .file_name()
        .map(|f| f.to_string_lossy().replace('_', "-"))
        .unwrap_or_default();
    format!("{prefix}-{folder}-{}", date.format("%y%m%d"))
}

/// Scans `directory`, resolves the project and writes the manifest to `manifest_path`.
///
/// The folder is scanned before any remote call, so a folder with bad file names never
/// creates a project.
pub async fn prepare_sample_list(
    directory: &Path,
    manifest_path: &Path,
    options: &ManifestOptions,
    resolver: &ProjectResolver,
    project_name_prefix: &str,
) -> Result<PreparedManifest, ManifestError> {
    let entries = collect_entries(directory, options.paired_end, options.sort)?;

    let project_id = match &options.project_id {
        Some(id) => id.clone(),
        None => {
            let name = options.project_name.clone().unwrap_or_else(|| {
                default_project_name(
                    project_name_prefix,
                    directory,
                    chrono::Local::now().date_naive(),
                )
            });
            resolver.resolve_or_create(&name, None).await?
        }
    };

    fs::write(manifest_path, render_manifest(&project_id, &entries))?;
    info!(
        "Wrote manifest {} with {} samples for project {}",
        manifest_path.display(),
        entries.len(),
        project_id
    );

    Ok(PreparedManifest {
        path: manifest_path.to_path_buf(),
        project_id,
        sample_count: entries.len(),
    })
}
