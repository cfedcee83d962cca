use std::collections::HashSet;
use std::fs;
use std::path::Path;

use legalpdf_to_ayat::{
    check_deps, document_report, emit_outputs, enumerate_pdfs, export_units, extract_pages, install_help_for,
    load_config, process_document, slugify, DocumentOutcome, EnumerateError, ExtractError, PageRules,
    PipelineConfig, RawPage,
};

fn log_event(event: serde_json::Value) {
    eprintln!("{}", event);
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).filter(|v| !v.starts_with("--")).cloned()
}

fn now_ms() -> i128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i128)
        .unwrap_or(0)
}

fn unique_doc_id(slug: String, used: &mut HashSet<String>) -> String {
    let mut candidate = slug.clone();
    let mut i = 1;
    while used.contains(&candidate) {
        candidate = format!("{}-{}", slug, i);
        i += 1;
    }
    used.insert(candidate.clone());
    candidate
}

fn dump_step(dir: &str, name: &str, body: &str) {
    let path = format!("{}/{}", dir, name);
    let res = fs::create_dir_all(dir).and_then(|_| fs::write(&path, body));
    if let Err(e) = res {
        log_event(serde_json::json!({"tool":"dump_steps","file": path,"error": e.to_string()}));
    }
}

fn dump_document(dir: &str, pages: &[RawPage], outcome: &DocumentOutcome) {
    let pages_txt: Vec<String> = pages
        .iter()
        .map(|p| format!("=== page {} ===\n{}", p.index, p.text))
        .collect();
    dump_step(dir, "step1_pages.txt", &pages_txt.join("\n"));

    let blocks_txt: Vec<String> = outcome
        .blocks
        .iter()
        .map(|b| format!("=== block anchor={} pages={:?} ===\n{}", b.anchor_page_index, b.constituent_pages, b.text))
        .collect();
    dump_step(dir, "step2_blocks.txt", &blocks_txt.join("\n"));

    let units_txt: Vec<String> = outcome
        .units
        .iter()
        .map(|u| {
            let ayat = u.clause_number.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
            format!("=== [{}] ayat={} page={} ===\n{}", u.article_label(), ayat, u.source_page, u.content)
        })
        .collect();
    dump_step(dir, "step3_units.txt", &units_txt.join("\n"));
}

fn resolve_config(explicit: Option<String>) -> PipelineConfig {
    let (path, required) = match explicit {
        Some(p) => (p, true),
        None => ("pipeline.yaml".to_string(), false),
    };
    if !required && !Path::new(&path).exists() {
        log_event(serde_json::json!({"tool":"load_config","file": path,"status":"default"}));
        return PipelineConfig::default();
    }
    match load_config(Path::new(&path)) {
        Ok(cfg) => {
            log_event(serde_json::json!({"tool":"load_config","file": path,"status":"ok","id": cfg.id}));
            cfg
        }
        Err(e) => {
            log_event(serde_json::json!({"tool":"load_config","file": path,"error": e.to_string(),"error_code": 3}));
            std::process::exit(3);
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let dump_steps = args.iter().any(|a| a == "--dump-steps");
    let strict = args.iter().any(|a| a == "--strict");
    let to_stdout = args.iter().any(|a| a == "--stdout");

    let mut cfg = resolve_config(flag_value(&args, "--config"));
    if let Some(glob) = flag_value(&args, "--input") {
        cfg.input.glob = glob;
    }
    if let Some(dir) = flag_value(&args, "--output") {
        cfg.output.dir = dir;
    }
    let rules = match PageRules::from_layout(&cfg.layout) {
        Ok(r) => r,
        Err(e) => {
            log_event(serde_json::json!({"tool":"load_config","error": e.to_string(),"error_code": 3}));
            std::process::exit(3);
        }
    };

    let deps = check_deps();
    let help = install_help_for(&deps.missing);
    if !deps.ok {
        log_event(serde_json::json!({"tool":"check_deps","missing": deps.missing,"error_code": 2}));
        eprintln!("{}", help);
        std::process::exit(2);
    }
    log_event(serde_json::json!({"tool":"check_deps","status":"ok","missing": deps.missing}));
    if !help.is_empty() {
        eprintln!("{}", help);
    }

    let files = match enumerate_pdfs(cfg.input_glob()) {
        Ok(files) => files,
        Err(EnumerateError::NoFilesFound { guidance }) => {
            log_event(serde_json::json!({"tool":"enumerate_pdfs","error":"NoFilesFound","error_code": 1}));
            eprintln!("{}", guidance);
            std::process::exit(1);
        }
    };
    log_event(serde_json::json!({"tool":"enumerate_pdfs","count": files.len()}));

    let mut used_doc_ids: HashSet<String> = HashSet::new();
    for file in files {
        let started_ms = now_ms();
        let source = file.file_name().and_then(|s| s.to_str()).unwrap_or("doc.pdf").to_string();
        let doc_id = unique_doc_id(slugify(source.trim_end_matches(".pdf")), &mut used_doc_ids);
        let doc_outdir = Path::new(cfg.output_dir()).join(&doc_id);

        let pages = match extract_pages(&file) {
            Ok(pages) => pages,
            Err(err) => {
                let label = match err {
                    ExtractError::FileNotFound(_) => "FileNotFound",
                    ExtractError::EncryptedPdf(_) => "EncryptedPDF",
                    ExtractError::Poppler(_) => "PopplerError",
                };
                log_event(serde_json::json!({
                    "tool":"extract_pages",
                    "file": file,
                    "error": label,
                    "detail": err.to_string(),
                    "error_code": 1
                }));
                std::process::exit(1);
            }
        };
        log_event(serde_json::json!({"tool":"extract_pages","file": file,"pages": pages.len()}));

        let outcome = process_document(&pages, &rules);
        log_event(serde_json::json!({"tool":"process_document","file": file,"stats": outcome.stats}));

        if dump_steps {
            let artifacts = doc_outdir.join("artifacts");
            dump_document(&artifacts.to_string_lossy(), &pages, &outcome);
        }

        if strict && outcome.lacks_structure() {
            log_event(serde_json::json!({
                "tool":"process_document",
                "file": file,
                "error":"StructureNotFound",
                "error_code": 5,
                "stats": outcome.stats
            }));
            std::process::exit(5);
        }

        let export = export_units(&outcome.units, &source);
        if to_stdout {
            match serde_json::to_string_pretty(&export) {
                Ok(s) => println!("{}", s),
                Err(e) => {
                    log_event(serde_json::json!({"tool":"emit_outputs","file": file,"error": e.to_string(),"error_code": 6}));
                    std::process::exit(6);
                }
            }
            continue;
        }

        let mut report = document_report(&doc_id, &source, &outcome);
        if let Some(obj) = report.as_object_mut() {
            obj.insert(
                "timestamps".to_string(),
                serde_json::json!({"started_ms": started_ms, "finished_ms": now_ms()}),
            );
        }
        match emit_outputs(&export, &report, &doc_outdir, &doc_id) {
            Ok(paths) => log_event(serde_json::json!({
                "tool":"emit_outputs",
                "file": file,
                "units_path": paths.units_path,
                "report_path": paths.report_path,
                "total_chunks": export.total_chunks
            })),
            Err(e) => {
                log_event(serde_json::json!({"tool":"emit_outputs","file": file,"error": e.to_string(),"error_code": 6}));
                std::process::exit(6);
            }
        }
    }
}
