use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use globwalk::GlobWalkerBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Label written for units whose governing Pasal was never observed.
pub const UNKNOWN_ARTICLE: &str = "Unknown";

/// Cap on a Pasal title taken from text with no trailing newline.
pub const TITLE_MAX_CHARS: usize = 120;

// "Pasal 12" anywhere in a passage, any casing.
static ARTICLE_ANYWHERE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bpasal[ \t]+\d+").unwrap());
// Article heading at the start of an already-trimmed line.
static ARTICLE_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:Pasal|PASAL)\s+\d+").unwrap());
// Clause marker "(3)" at the start of an already-trimmed line.
static CLAUSE_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(\d+\)").unwrap());
// Clause boundary: "(N)" at text start or right after a newline, indentation allowed.
static CLAUSE_BOUNDARY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*\((\d+)\)").unwrap());
static CHAPTER_LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*BAB\s+[IVXLCDM]+\s*$").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub id: String,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub glob: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
}

/// Typographic conventions of the source booklet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    /// Pages with an index below this are front matter.
    pub cover_pages: usize,
    /// Minimum run of dots that counts as a TOC leader.
    pub toc_leader_dots: usize,
    /// Leader lines needed before a page is treated as TOC.
    pub toc_min_leader_lines: usize,
    /// Book-title phrase repeated in the running header of every page.
    pub running_title: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { glob: "./input/**/*.pdf".to_string() }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: "./output".to_string() }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            cover_pages: 2,
            toc_leader_dots: 5,
            toc_min_leader_lines: 2,
            running_title: "Peraturan Akademik".to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            id: "peraturan-akademik".to_string(),
            input: InputConfig::default(),
            output: OutputConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(String),
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl PipelineConfig {
    /// Reject configs whose layout rules cannot classify anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::Invalid("missing id".into()));
        }
        if self.layout.toc_leader_dots < 2 {
            return Err(ConfigError::Invalid("layout.toc_leader_dots must be at least 2".into()));
        }
        if self.layout.toc_min_leader_lines == 0 {
            return Err(ConfigError::Invalid("layout.toc_min_leader_lines must be at least 1".into()));
        }
        if self.layout.running_title.trim().is_empty() {
            return Err(ConfigError::Invalid("layout.running_title is blank".into()));
        }
        Ok(())
    }

    pub fn input_glob(&self) -> &str {
        &self.input.glob
    }

    pub fn output_dir(&self) -> &str {
        &self.output.dir
    }
}

/// Read, parse and validate a YAML pipeline config.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
    let cfg: PipelineConfig = serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepsResult {
    pub ok: bool,
    pub missing: Vec<String>,
}

/// Check external tools.
/// - Required: pdftotext
/// - Optional: pdfinfo (per-page extraction; otherwise split on form feed)
pub fn check_deps() -> DepsResult {
    let mut missing = Vec::new();
    let has_pdftotext = which::which("pdftotext").is_ok();
    if !has_pdftotext {
        missing.push("pdftotext".to_string());
    }
    if which::which("pdfinfo").is_err() {
        missing.push("pdfinfo".to_string());
    }
    DepsResult { ok: has_pdftotext, missing }
}

/// Installation hint for missing tools. Both live in poppler-utils.
pub fn install_help_for(missing: &[String]) -> String {
    if !missing.iter().any(|m| m == "pdftotext" || m == "pdfinfo") {
        return String::new();
    }
    "Dependency missing. Install Poppler:\n  sudo nala install poppler-utils".to_string()
}

#[derive(Debug, Error)]
pub enum EnumerateError {
    #[error("NoFilesFound")]
    NoFilesFound { guidance: String },
}

/// Enumerate PDFs matching a glob such as "./input/**/*.pdf", sorted.
pub fn enumerate_pdfs(glob_pattern: &str) -> Result<Vec<PathBuf>, EnumerateError> {
    let root = if Path::new(glob_pattern).is_absolute() { "/" } else { "." };
    let pattern = glob_pattern.trim_start_matches("./");
    let mut paths: Vec<PathBuf> = GlobWalkerBuilder::from_patterns(root, &[pattern])
        .follow_links(false)
        .build()
        .map_err(|_| EnumerateError::NoFilesFound { guidance: folder_guidance(glob_pattern) })?
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(EnumerateError::NoFilesFound { guidance: folder_guidance(glob_pattern) });
    }
    Ok(paths)
}

fn folder_guidance(pattern: &str) -> String {
    format!(
        "Tidak ada PDF pada pola {}\nContoh: letakkan berkas di ./input/Buku_Peraturan_Akademik_2024.pdf",
        pattern
    )
}

/// One physical page of extracted text, 0-indexed in physical order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawPage {
    pub index: usize,
    pub text: String,
}

/// Number a sequence of page texts in order.
pub fn raw_pages<I, S>(texts: I) -> Vec<RawPage>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| RawPage { index, text: text.into() })
        .collect()
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("FileNotFound: {0}")]
    FileNotFound(String),
    #[error("EncryptedPDF: {0}")]
    EncryptedPdf(String),
    #[error("PopplerError: {0}")]
    Poppler(String),
}

fn poppler_failure(path: &Path, stderr: &[u8], what: String) -> ExtractError {
    let err = String::from_utf8_lossy(stderr).to_lowercase();
    if err.contains("encrypt") || err.contains("password") {
        ExtractError::EncryptedPdf(path.display().to_string())
    } else {
        ExtractError::Poppler(what)
    }
}

fn pdfinfo_page_count(path: &Path) -> Result<Option<usize>, ExtractError> {
    if which::which("pdfinfo").is_err() {
        return Ok(None);
    }
    let out = match Command::new("pdfinfo").arg(path).output() {
        Ok(out) => out,
        Err(_) => return Ok(None),
    };
    if !out.status.success() {
        return match poppler_failure(path, &out.stderr, "pdfinfo failed".into()) {
            e @ ExtractError::EncryptedPdf(_) => Err(e),
            _ => Ok(None),
        };
    }
    let info = String::from_utf8_lossy(&out.stdout);
    let pages = info
        .lines()
        .find_map(|l| l.strip_prefix("Pages:"))
        .and_then(|n| n.trim().parse::<usize>().ok());
    Ok(pages)
}

fn run_pdftotext(path: &Path, page_no: Option<usize>) -> Result<String, ExtractError> {
    let mut cmd = Command::new("pdftotext");
    cmd.arg("-q");
    if let Some(n) = page_no {
        cmd.arg("-nopgbrk").arg("-f").arg(n.to_string()).arg("-l").arg(n.to_string());
    }
    cmd.arg(path).arg("-");
    let out = cmd.output().map_err(|e| ExtractError::Poppler(e.to_string()))?;
    if !out.status.success() {
        let what = match page_no {
            Some(n) => format!("pdftotext failed on page {}", n),
            None => "pdftotext failed".to_string(),
        };
        return Err(poppler_failure(path, &out.stderr, what));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Extract per-page text with Poppler in reading order.
/// Uses one pdftotext call per page when pdfinfo reports a page count,
/// otherwise a single pass split on form feeds.
pub fn extract_pages(path: &Path) -> Result<Vec<RawPage>, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::FileNotFound(path.display().to_string()));
    }
    if let Some(n_pages) = pdfinfo_page_count(path)? {
        let texts = (1..=n_pages)
            .map(|n| run_pdftotext(path, Some(n)))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(raw_pages(texts));
    }
    let whole = run_pdftotext(path, None)?;
    let mut texts: Vec<&str> = whole.split('\u{000C}').collect();
    while matches!(texts.last(), Some(last) if last.trim().is_empty()) {
        texts.pop();
    }
    Ok(raw_pages(texts))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Cover,
    TableOfContents,
    Content,
}

/// Layout rules compiled once per document run.
#[derive(Debug, Clone)]
pub struct PageRules {
    cover_pages: usize,
    toc_min_leader_lines: usize,
    leader_re: Regex,
    running_title_re: Regex,
}

impl PageRules {
    pub fn from_layout(layout: &LayoutConfig) -> Result<Self, ConfigError> {
        let phrase = layout
            .running_title
            .split_whitespace()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"\s+");
        if phrase.is_empty() {
            return Err(ConfigError::Invalid("layout.running_title is blank".into()));
        }
        // At most two short words before the phrase, year closing the line.
        let running_title_re = Regex::new(&format!(r"(?i)^\W*(?:\w+\s+){{0,2}}{}\b.{{0,40}}\b\d{{4}}\W*$", phrase))
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let leader_re = Regex::new(&format!(r"\.{{{},}}", layout.toc_leader_dots.max(1)))
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(Self {
            cover_pages: layout.cover_pages,
            toc_min_leader_lines: layout.toc_min_leader_lines,
            leader_re,
            running_title_re,
        })
    }

    pub fn is_cover(&self, page_index: usize) -> bool {
        page_index < self.cover_pages
    }

    /// TOC pages carry dot leaders ("Pasal 3 ........ 12") on several lines.
    pub fn is_toc(&self, text: &str) -> bool {
        text.lines().filter(|l| self.leader_re.is_match(l)).count() >= self.toc_min_leader_lines
    }

    pub fn classify(&self, page_index: usize, text: &str) -> PageKind {
        if self.is_cover(page_index) {
            PageKind::Cover
        } else if self.is_toc(text) {
            PageKind::TableOfContents
        } else {
            PageKind::Content
        }
    }

    /// Running title: a standalone line of the book-title phrase ending in
    /// a 4-digit year. Lines opening with a clause or Pasal marker are body text.
    pub fn is_running_header(&self, line: &str) -> bool {
        let trimmed = line.trim();
        if CLAUSE_LINE_RE.is_match(trimmed) || ARTICLE_LINE_RE.is_match(trimmed) {
            return false;
        }
        self.running_title_re.is_match(trimmed)
    }

    /// Drop running titles and bare "BAB IV" lines; everything else,
    /// blank lines included, keeps its order. Result is trimmed.
    pub fn strip_headers(&self, text: &str) -> String {
        text.lines()
            .filter(|l| !self.is_running_header(l) && !is_chapter_label(l))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

/// Bare chapter label such as "BAB IV" with nothing else on the line.
pub fn is_chapter_label(line: &str) -> bool {
    CHAPTER_LABEL_RE.is_match(line)
}

/// Whether a cleaned page opens mid-paragraph, judged by its first
/// non-blank line. Pasal headings, clause markers and all-caps headings
/// start a new unit.
pub fn is_continuation(text: &str) -> bool {
    let first = match text.lines().map(str::trim).find(|l| !l.is_empty()) {
        Some(line) => line,
        None => return false,
    };
    if ARTICLE_LINE_RE.is_match(first) || CLAUSE_LINE_RE.is_match(first) {
        return false;
    }
    let mut letters = first.chars().filter(|c| c.is_alphabetic()).peekable();
    if letters.peek().is_some() && letters.all(char::is_uppercase) {
        return false;
    }
    true
}

/// A page that survived classification and stripping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    pub page_index: usize,
    pub cleaned_text: String,
}

/// One or more consecutive candidates forming a continuous passage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergedBlock {
    pub anchor_page_index: usize,
    pub text: String,
    pub constituent_pages: Vec<usize>,
    pub is_multi_page: bool,
}

impl MergedBlock {
    fn seed(candidate: &Candidate) -> Self {
        Self {
            anchor_page_index: candidate.page_index,
            text: candidate.cleaned_text.clone(),
            constituent_pages: vec![candidate.page_index],
            is_multi_page: false,
        }
    }

    fn absorb(&mut self, candidate: &Candidate) {
        self.text.push('\n');
        self.text.push_str(&candidate.cleaned_text);
        self.constituent_pages.push(candidate.page_index);
        self.is_multi_page = true;
    }
}

/// Left-to-right fold of candidates into blocks; a continuation page
/// extends the open block, anything else closes it and opens a new one.
pub fn merge_pages(candidates: &[Candidate]) -> Vec<MergedBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<MergedBlock> = None;
    for candidate in candidates {
        let continues = open.is_some() && is_continuation(&candidate.cleaned_text);
        if continues {
            if let Some(block) = open.as_mut() {
                block.absorb(candidate);
            }
            continue;
        }
        if let Some(done) = open.replace(MergedBlock::seed(candidate)) {
            blocks.push(done);
        }
    }
    blocks.extend(open);
    blocks
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Title of the first "Pasal N" in `text`, running to the end of its line.
/// A following line that is not itself a clause or Pasal marker is joined
/// on, recovering titles typeset as "Pasal 3" / "Registrasi".
pub fn find_article_title(text: &str) -> Option<String> {
    let m = ARTICLE_ANYWHERE_RE.find(text)?;
    let rest = &text[m.start()..];
    let (base, after) = match rest.find('\n') {
        Some(nl) => (&rest[..nl], Some(&rest[nl + 1..])),
        None => (truncate_chars(rest, TITLE_MAX_CHARS), None),
    };
    let mut title = base.trim().to_string();
    let next = after.and_then(|a| a.lines().next()).map(str::trim);
    if let Some(next) = next {
        if !next.is_empty() && !CLAUSE_LINE_RE.is_match(next) && !ARTICLE_LINE_RE.is_match(next) {
            title.push(' ');
            title.push_str(next);
        }
    }
    Some(title)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClauseBoundary {
    /// Byte offset of the start of the marker's line.
    pub offset: usize,
    pub number: Option<u32>,
}

/// "(N)" markers that open a line. Mid-line references such as
/// "ayat (1) huruf a" are not boundaries.
pub fn find_clause_boundaries(text: &str) -> Vec<ClauseBoundary> {
    CLAUSE_BOUNDARY_RE
        .captures_iter(text)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let number = cap.get(1).and_then(|n| n.as_str().parse::<u32>().ok());
            Some(ClauseBoundary { offset: whole.start(), number })
        })
        .collect()
}

/// Final output element: one Ayat (or preamble / whole block).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClauseUnit {
    pub content: String,
    pub article_context: Option<String>,
    pub clause_number: Option<u32>,
    pub source_page: usize,
    pub merged_pages: Vec<usize>,
    pub is_multi_page: bool,
}

impl ClauseUnit {
    fn within(block: &MergedBlock, content: &str, article_context: Option<String>, clause_number: Option<u32>) -> Self {
        Self {
            content: content.to_string(),
            article_context,
            clause_number,
            source_page: block.anchor_page_index,
            merged_pages: block.constituent_pages.clone(),
            is_multi_page: block.is_multi_page,
        }
    }

    pub fn article_label(&self) -> &str {
        self.article_context.as_deref().unwrap_or(UNKNOWN_ARTICLE)
    }
}

/// Split one block into units, threading the carried Pasal context.
/// Returns the units and the context to hand to the next block.
pub fn segment_block(block: &MergedBlock, carried: Option<String>) -> (Vec<ClauseUnit>, Option<String>) {
    let mut context = carried;
    let block_title = find_article_title(&block.text);
    let boundaries = find_clause_boundaries(&block.text);

    if boundaries.is_empty() {
        if block_title.is_some() {
            context = block_title;
        }
        let unit = ClauseUnit::within(block, block.text.trim(), context.clone(), None);
        return (vec![unit], context);
    }

    let mut spans: Vec<(&str, Option<u32>)> = Vec::with_capacity(boundaries.len() + 1);
    let preamble = block.text[..boundaries[0].offset].trim();
    if !preamble.is_empty() {
        spans.push((preamble, None));
    }
    for (i, boundary) in boundaries.iter().enumerate() {
        let end = boundaries.get(i + 1).map_or(block.text.len(), |next| next.offset);
        spans.push((block.text[boundary.offset..end].trim(), boundary.number));
    }

    let mut units = Vec::with_capacity(spans.len());
    for (content, number) in spans {
        if let Some(title) = find_article_title(content).or_else(|| block_title.clone()) {
            context = Some(title);
        }
        units.push(ClauseUnit::within(block, content, context.clone(), number));
    }
    (units, context)
}

/// Segment every block of one document, starting from no known Pasal.
pub fn segment_blocks(blocks: &[MergedBlock]) -> Vec<ClauseUnit> {
    let (units, _) = blocks.iter().fold((Vec::new(), None), |(mut units, carried), block| {
        let (produced, next) = segment_block(block, carried);
        units.extend(produced);
        (units, next)
    });
    units
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Cover,
    TableOfContents,
    EmptyAfterStrip,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageSkip {
    pub page_index: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentStats {
    pub pages_seen: usize,
    pub skipped_cover: usize,
    pub skipped_toc: usize,
    pub skipped_empty: usize,
    pub candidates: usize,
    pub blocks: usize,
    pub multi_page_blocks: usize,
    pub units: usize,
    pub numbered_clauses: usize,
    pub units_without_article: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub blocks: Vec<MergedBlock>,
    pub units: Vec<ClauseUnit>,
    pub skipped: Vec<PageSkip>,
    pub stats: DocumentStats,
}

impl DocumentOutcome {
    /// Units were produced but none could be tied to a Pasal.
    /// An empty document is not a structure failure.
    pub fn lacks_structure(&self) -> bool {
        !self.units.is_empty() && self.units.iter().all(|u| u.article_context.is_none())
    }
}

/// Classify, strip, merge and segment one document's pages.
/// An empty `units` list is a valid outcome, not an error.
pub fn process_document(pages: &[RawPage], rules: &PageRules) -> DocumentOutcome {
    let mut skipped = Vec::new();
    let mut candidates = Vec::new();
    for page in pages {
        let reason = match rules.classify(page.index, &page.text) {
            PageKind::Cover => SkipReason::Cover,
            PageKind::TableOfContents => SkipReason::TableOfContents,
            PageKind::Content => {
                let cleaned_text = rules.strip_headers(&page.text);
                if !cleaned_text.is_empty() {
                    candidates.push(Candidate { page_index: page.index, cleaned_text });
                    continue;
                }
                SkipReason::EmptyAfterStrip
            }
        };
        skipped.push(PageSkip { page_index: page.index, reason });
    }

    let blocks = merge_pages(&candidates);
    let units = segment_blocks(&blocks);
    let count = |r: SkipReason| skipped.iter().filter(|s| s.reason == r).count();
    let stats = DocumentStats {
        pages_seen: pages.len(),
        skipped_cover: count(SkipReason::Cover),
        skipped_toc: count(SkipReason::TableOfContents),
        skipped_empty: count(SkipReason::EmptyAfterStrip),
        candidates: candidates.len(),
        blocks: blocks.len(),
        multi_page_blocks: blocks.iter().filter(|b| b.is_multi_page).count(),
        units: units.len(),
        numbered_clauses: units.iter().filter(|u| u.clause_number.is_some()).count(),
        units_without_article: units.iter().filter(|u| u.article_context.is_none()).count(),
    };
    DocumentOutcome { blocks, units, skipped, stats }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitMetadata {
    pub source: String,
    pub page: usize,
    pub merged_pages: Vec<usize>,
    pub is_multi_page: bool,
    pub pasal: String,
    pub ayat: Option<u32>,
    pub content_sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportedUnit {
    pub id: usize,
    pub content: String,
    pub metadata: UnitMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitExport {
    pub total_chunks: usize,
    pub chunks: Vec<ExportedUnit>,
}

/// Flatten units into sequentially numbered records (ids start at 1).
pub fn export_units(units: &[ClauseUnit], source: &str) -> UnitExport {
    let chunks: Vec<ExportedUnit> = units
        .iter()
        .enumerate()
        .map(|(i, u)| ExportedUnit {
            id: i + 1,
            content: u.content.clone(),
            metadata: UnitMetadata {
                source: source.to_string(),
                page: u.source_page,
                merged_pages: u.merged_pages.clone(),
                is_multi_page: u.is_multi_page,
                pasal: u.article_label().to_string(),
                ayat: u.clause_number,
                content_sha256: sha256_hex(u.content.as_bytes()),
            },
        })
        .collect();
    UnitExport { total_chunks: chunks.len(), chunks }
}

/// Per-document report with a fingerprint over its own content.
pub fn document_report(doc_id: &str, source: &str, outcome: &DocumentOutcome) -> serde_json::Value {
    let mut report = serde_json::json!({
        "doc_id": doc_id,
        "source": source,
        "stats": outcome.stats,
        "skipped_pages": outcome.skipped,
    });
    let bytes = serde_json::to_vec(&report).unwrap_or_default();
    if let Some(obj) = report.as_object_mut() {
        obj.insert("report_fingerprint".to_string(), serde_json::json!(sha256_hex(&bytes)));
    }
    report
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("WriteFailed: {0}")]
    WriteFailed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitPaths {
    pub units_path: String,
    pub report_path: String,
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), EmitError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| EmitError::WriteFailed(e.to_string()))?;
    tmp.write_all(bytes).map_err(|e| EmitError::WriteFailed(e.to_string()))?;
    tmp.persist(path).map_err(|e| EmitError::WriteFailed(e.error.to_string()))?;
    Ok(())
}

/// Write `<doc_id>.units.json` and `<doc_id>.report.json` into `outdir`.
pub fn emit_outputs(
    export: &UnitExport,
    report: &serde_json::Value,
    outdir: &Path,
    doc_id: &str,
) -> Result<EmitPaths, EmitError> {
    std::fs::create_dir_all(outdir).map_err(|e| EmitError::WriteFailed(e.to_string()))?;
    let units_path = outdir.join(format!("{}.units.json", doc_id));
    let report_path = outdir.join(format!("{}.report.json", doc_id));

    let units_bytes = serde_json::to_vec_pretty(export).map_err(|e| EmitError::WriteFailed(e.to_string()))?;
    let report_bytes = serde_json::to_vec_pretty(report).map_err(|e| EmitError::WriteFailed(e.to_string()))?;
    write_atomic(&units_path, &units_bytes)?;
    write_atomic(&report_path, &report_bytes)?;

    Ok(EmitPaths {
        units_path: units_path.to_string_lossy().into_owned(),
        report_path: report_path.to_string_lossy().into_owned(),
    })
}

/// Lowercase ASCII slug with single dashes; "doc" when nothing survives.
pub fn slugify(base: &str) -> String {
    let mut slug = String::with_capacity(base.len());
    for ch in base.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "doc".to_string()
    } else {
        slug.to_string()
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
}
