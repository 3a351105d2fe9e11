mod common;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use common::fixtures::{bare_config, prose_document, PROSE};
use pagebox::{LayoutEngine, NodeId, PageGrid, PaginationPass, RenderTree};
use pagebox_snapshot::{
    FileSnapshotStore, PageSnapshot, SnapshotBoxType, SnapshotError, SnapshotKind,
};

const TOLERANCE: f32 = 1e-3;
static ROOT_NONCE: AtomicU64 = AtomicU64::new(0);

fn temp_store_root(label: &str) -> PathBuf {
    let nonce = ROOT_NONCE.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "pagebox-handoff-{label}-{}-{nonce}",
        std::process::id()
    ))
}

fn paginated(paragraphs: usize, grid_height: f32) -> (RenderTree, NodeId, PageGrid) {
    let config = bare_config(200.0, grid_height);
    let grid = PageGrid::from_config(&config);
    let mut tree = RenderTree::new();
    let page = prose_document(&mut tree, paragraphs);
    LayoutEngine::new(config)
        .layout(&mut tree, page)
        .expect("layout should pass");
    PaginationPass::new(grid)
        .run(&mut tree, page)
        .expect("pagination should pass");
    (tree, page, grid)
}

#[test]
fn physical_pages_hold_whole_lines() {
    let (tree, page, grid) = paginated(6, 95.0);
    let snapshot = PageSnapshot::capture(&tree, page).expect("capture should pass");
    let pages = snapshot.split_pages(&grid);

    let bottom = tree.geometry(page).expect("geometry should pass").bottom();
    assert_eq!(pages.len(), grid.page_count(bottom));
    let mut lines = 0;
    for physical in &pages {
        for item in &physical.items {
            let node = &snapshot.nodes[item.node];
            if node.kind != (SnapshotKind::Box { box_type: SnapshotBoxType::Line }) {
                continue;
            }
            lines += 1;
            assert!(item.y >= -TOLERANCE);
            assert!(
                item.y + item.height <= grid.page_height() + TOLERANCE,
                "line on page {} ends at {}",
                physical.index,
                item.y + item.height
            );
        }
    }
    assert!(lines > 0);
}

#[test]
fn captured_text_runs_follow_reading_order() {
    let (tree, page, _) = paginated(3, 95.0);
    let snapshot = PageSnapshot::capture(&tree, page).expect("capture should pass");

    let runs: Vec<&str> = snapshot.text_runs().collect();
    let expected: Vec<&str> = PROSE.split_whitespace().cycle().take(runs.len()).collect();
    assert_eq!(runs.len(), PROSE.split_whitespace().count() * 3);
    assert_eq!(runs, expected);
    assert_eq!(snapshot.nodes.len(), tree.descendants(page).expect("walk").count());
}

#[test]
fn stored_snapshot_loads_back_identical() {
    let (tree, page, _) = paginated(4, 95.0);
    let snapshot = PageSnapshot::capture(&tree, page).expect("capture should pass");
    let store = FileSnapshotStore::new(temp_store_root("roundtrip"));

    assert!(store.load("chapter-1").expect("load should pass").is_none());
    let path = store.store("chapter-1", &snapshot).expect("store should pass");
    assert!(path.exists());
    let loaded = store
        .load("chapter-1")
        .expect("load should pass")
        .expect("snapshot should exist");
    assert_eq!(loaded, snapshot);

    let tight = FileSnapshotStore::new(store.root()).with_max_file_bytes(16);
    assert!(matches!(
        tight.store("chapter-2", &snapshot),
        Err(SnapshotError::TooLarge { limit: 16, .. })
    ));

    store.remove("chapter-1").expect("remove should pass");
    assert!(store.load("chapter-1").expect("load should pass").is_none());
    let _ = std::fs::remove_dir_all(store.root());
}
