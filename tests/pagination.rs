//! Page Resolution Tests
//!
//! Pure checks of page-number resolution; no database needed.

use yatube::domain::page::{Page, PageWindow, PAGE_SIZE};

#[test]
fn thirteen_items_split_ten_and_three() {
    let first = PageWindow::resolve(None, 13, PAGE_SIZE);
    assert_eq!(first.number, 1);
    assert_eq!(first.num_pages, 2);
    assert_eq!(first.offset(), 0);
    assert_eq!(first.end_index() - first.start_index() + 1, 10);

    let second = PageWindow::resolve(Some("2"), 13, PAGE_SIZE);
    assert_eq!(second.number, 2);
    assert_eq!(second.offset(), 10);
    assert_eq!(second.end_index() - second.start_index() + 1, 3);
    assert!(!second.has_next());
    assert!(second.has_previous());
}

#[test]
fn missing_or_junk_page_is_first() {
    for requested in [None, Some(""), Some("abc"), Some("1.5")] {
        let window = PageWindow::resolve(requested, 25, PAGE_SIZE);
        assert_eq!(window.number, 1, "requested {:?}", requested);
    }
}

#[test]
fn out_of_range_page_is_last() {
    for requested in [
        "0",
        "-3",
        "4",
        "9999",
        "99999999999999999999",
        "-99999999999999999999",
    ] {
        let window = PageWindow::resolve(Some(requested), 25, PAGE_SIZE);
        assert_eq!(window.number, 3, "requested {}", requested);
    }
}

#[test]
fn empty_listing_has_one_empty_page() {
    let window = PageWindow::resolve(Some("5"), 0, PAGE_SIZE);
    assert_eq!(window.number, 1);
    assert_eq!(window.num_pages, 1);
    assert_eq!(window.start_index(), 0);
    assert_eq!(window.end_index(), 0);
    assert!(!window.has_next());
    assert!(!window.has_previous());
}

#[test]
fn exact_multiple_has_no_trailing_page() {
    let window = PageWindow::resolve(Some("3"), 20, PAGE_SIZE);
    assert_eq!(window.num_pages, 2);
    assert_eq!(window.number, 2);
}

#[test]
fn page_links_follow_window() {
    let window = PageWindow::resolve(Some("2"), 35, PAGE_SIZE);
    let page = Page::new(window, vec!["a", "b"]);
    assert_eq!(page.next_page_number, Some(3));
    assert_eq!(page.previous_page_number, Some(1));
    assert_eq!(page.start_index, 11);
    assert_eq!(page.end_index, 20);

    let mapped = page.map(str::len);
    assert_eq!(mapped.object_list, vec![1, 1]);
    assert_eq!(mapped.number, 2);
}
