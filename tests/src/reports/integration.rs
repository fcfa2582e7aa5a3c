use std::fs;
use std::time::Duration;

use sweepr_core::report::{Category, Document, ExportKind, Pager, SEARCH_FILE, filter_file, search};

use crate::util::session_in;

const CLEAN_HOST: &str = "\
PHASE 3: PORT SCAN
PORT     STATE SERVICE
22/tcp   open  ssh
8080/tcp open  http-proxy
Service Info: OS: Linux
";

#[test]
fn clean_report_offers_no_vulnerability_view() {
    let dir = tempfile::tempdir().unwrap();
    let store = session_in(dir.path()).reports();
    let report = store.save("analysis", "192.168.1.20", CLEAN_HOST).unwrap();
    let document = report.document();

    assert_eq!(report.stats().vulnerabilities, 0);
    assert!(Category::Vulnerabilities.filter(&document).is_empty());

    let ports = Category::OpenPorts.filter(&document);
    let path = store.write_view(&filter_file(Category::OpenPorts), &ports).unwrap();
    let written = fs::read_to_string(path).unwrap();
    assert_eq!(written.lines().count(), report.stats().open_ports);
    assert!(!dir.path().join(filter_file(Category::Vulnerabilities)).exists());
}

#[test]
fn search_view_replaces_the_previous_one() {
    let dir = tempfile::tempdir().unwrap();
    let store = session_in(dir.path()).reports();
    let document = Document::from_text("report", CLEAN_HOST);

    store.write_view(SEARCH_FILE, &search(&document, "ssh")).unwrap();
    store.write_view(SEARCH_FILE, &search(&document, "HTTP")).unwrap();

    let written = fs::read_to_string(dir.path().join(SEARCH_FILE)).unwrap();
    assert_eq!(written.trim(), "8080/tcp open  http-proxy");
}

#[test]
fn exports_are_not_listed_as_reports_but_are_purged() {
    let dir = tempfile::tempdir().unwrap();
    let store = session_in(dir.path()).reports();
    let report = store.save("analysis", "10.0.0.5", CLEAN_HOST).unwrap();
    store
        .export(
            &Category::OpenPorts.filter(&report.document()),
            &ExportKind::Filtered {
                expression: String::from("category: open ports"),
            },
        )
        .unwrap();

    assert_eq!(store.list().unwrap().len(), 1);
    assert_eq!(store.purge_older_than(Duration::from_secs(3600)).unwrap(), 0);
    assert_eq!(store.purge_older_than(Duration::ZERO).unwrap(), 2);
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn pager_over_a_saved_report() {
    let dir = tempfile::tempdir().unwrap();
    let store = session_in(dir.path()).reports();
    let body: String = (1..=45).map(|n| format!("line {n}\n")).collect();
    let document = store.save("analysis", "10.0.0.5", &body).unwrap().document();

    let mut pager = Pager::new(document.len(), 20);
    assert_eq!(pager.total_pages(), 3);
    pager.last();
    assert_eq!(pager.range(), 40..45);
    assert!(pager.goto(4).is_err());
    assert_eq!(pager.page(), 3);
}
