use legalpdf_to_ayat::{process_document, raw_pages, LayoutConfig, PageRules, SkipReason};

fn rules_without_cover() -> PageRules {
    PageRules::from_layout(&LayoutConfig { cover_pages: 0, ..LayoutConfig::default() }).unwrap()
}

#[test]
fn cover_and_toc_prefix_is_discarded() {
    let pages = raw_pages(vec![
        "UNIVERSITAS",
        "PERATURAN AKADEMIK",
        "DAFTAR ISI\nBAB I ........ 1\nPasal 1 ........ 2\nPasal 2 ........ 3",
        "Pasal 1\nKetentuan\n(1) Isi ayat satu.",
    ]);
    let rules = PageRules::from_layout(&LayoutConfig::default()).unwrap();
    let out = process_document(&pages, &rules);

    let skipped: Vec<(usize, SkipReason)> = out.skipped.iter().map(|s| (s.page_index, s.reason)).collect();
    assert_eq!(
        skipped,
        vec![(0, SkipReason::Cover), (1, SkipReason::Cover), (2, SkipReason::TableOfContents)]
    );
    assert_eq!(out.stats.candidates, 1);
    assert_eq!(out.blocks.len(), 1);
    assert_eq!(out.blocks[0].anchor_page_index, 3);
}

#[test]
fn regulation_pages_end_to_end() {
    let pages = raw_pages(vec![
        "BAB I\nKETENTUAN UMUM",
        "Pasal 1\nDefinisi\n(1) Universitas adalah...",
        "(2) Mahasiswa adalah... lanjutan di halaman berikut",
        "tanpa batas yang jelas merupakan sambungan",
    ]);
    let out = process_document(&pages, &rules_without_cover());

    assert_eq!(out.blocks.len(), 3);
    assert_eq!(out.blocks[0].text, "KETENTUAN UMUM");
    assert_eq!(out.blocks[2].constituent_pages, vec![2, 3]);

    assert_eq!(out.units.len(), 4);
    assert_eq!(out.units[0].article_context, None);
    assert_eq!(out.units[1].content, "Pasal 1\nDefinisi");
    assert_eq!(out.units[3].clause_number, Some(2));
    assert_eq!(out.units[3].article_context.as_deref(), Some("Pasal 1 Definisi"));
    assert!(out.units[3].is_multi_page);
    assert_eq!(out.units[3].merged_pages, vec![2, 3]);

    let s = &out.stats;
    assert_eq!(s.pages_seen, 4);
    assert_eq!(s.blocks, 3);
    assert_eq!(s.multi_page_blocks, 1);
    assert_eq!(s.units, 4);
    assert_eq!(s.numbered_clauses, 2);
    assert_eq!(s.units_without_article, 1);
}

#[test]
fn header_only_page_is_skipped_as_empty() {
    let pages = raw_pages(vec!["Buku Peraturan Akademik 2024\nBAB III", "Pasal 2\nisi"]);
    let out = process_document(&pages, &rules_without_cover());
    assert_eq!(out.skipped.len(), 1);
    assert_eq!(out.skipped[0].page_index, 0);
    assert_eq!(out.skipped[0].reason, SkipReason::EmptyAfterStrip);
    assert_eq!(out.stats.skipped_empty, 1);
    assert_eq!(out.blocks.len(), 1);
}

#[test]
fn no_block_vanishes_and_context_never_regresses() {
    let pages = raw_pages(vec![
        "Peraturan Akademik 2024\npembukaan tanpa pasal",
        "Pasal 3\nKurikulum\n(1) Kurikulum disusun.\n(2) Kurikulum ditinjau.",
        "dan seterusnya sampai akhir",
        "KETERANGAN\nlihat ayat (1) huruf a\n(4) Ketentuan lain.",
        "Pasal 4\n(1) Beban studi.",
    ]);
    let out = process_document(&pages, &rules_without_cover());

    let non_empty_blocks = out.blocks.iter().filter(|b| !b.text.trim().is_empty()).count();
    assert!(out.units.len() >= non_empty_blocks);

    let first_known = out.units.iter().position(|u| u.article_context.is_some()).unwrap();
    assert!(out.units[first_known..].iter().all(|u| u.article_context.is_some()));
    assert_eq!(out.units.last().unwrap().article_label(), "Pasal 4");
}

#[test]
fn empty_document_is_empty_result() {
    let rules = PageRules::from_layout(&LayoutConfig::default()).unwrap();
    let out = process_document(&[], &rules);
    assert!(out.units.is_empty());
    assert_eq!(out.stats.pages_seen, 0);

    let only_cover = raw_pages(vec!["SAMPUL", "KATA PENGANTAR"]);
    let out = process_document(&only_cover, &rules);
    assert!(out.blocks.is_empty());
    assert_eq!(out.stats.skipped_cover, 2);
}

#[test]
fn rerun_is_identical() {
    let pages = raw_pages(vec!["Pasal 1\nUmum\n(1) a\n(2) b", "lanjutan"]);
    let rules = rules_without_cover();
    let a = process_document(&pages, &rules);
    let b = process_document(&pages, &rules);
    assert_eq!(a.units, b.units);
    assert_eq!(a.stats, b.stats);
}

#[test]
fn structure_failure_needs_units() {
    let rules = rules_without_cover();
    assert!(!process_document(&[], &rules).lacks_structure());
    assert!(process_document(&raw_pages(vec!["hanya teks biasa"]), &rules).lacks_structure());
    assert!(!process_document(&raw_pages(vec!["Pasal 1\nUmum"]), &rules).lacks_structure());
}
