//! DHAT heap profiler for pagebox.
//!
//! Profiles allocation patterns of the layout pipeline over a synthetic
//! document: segment -> pack lines -> lay out -> paginate -> snapshot.
//!
//! Usage:
//!   cargo run -p pagebox-heap-profile --release -- [OPTIONS]
//!
//! Outputs dhat-<phase>.json in the output directory (default: target/memory).
//! Open in https://nnethercote.github.io/dh_view/dh_view.html

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::PathBuf;
use std::sync::Arc;

use pagebox::{
    BoxType, HeuristicTextMeasurer, LayoutConfig, LayoutEngine, NodeId, PageGrid, PaginationPass,
    RenderTree, TextSegmenter, TextStyle,
};
use pagebox_snapshot::PageSnapshot;

const PAGE_WIDTH: f32 = 480.0;
const PAGE_HEIGHT: f32 = 800.0;
const SAMPLE_TEXT: &str = "It was a bright cold day in April, and the clocks were striking \
thirteen. Winston Smith, his chin nuzzled into his breast in an effort to escape the vile \
wind, slipped quickly through the glass doors of Victory Mansions, though not quickly \
enough to prevent a swirl of gritty dust from entering along with him.";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Segment,
    Layout,
    Paginate,
    Full,
}

impl Phase {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "segment" => Some(Self::Segment),
            "layout" => Some(Self::Layout),
            "paginate" => Some(Self::Paginate),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Segment => "segment",
            Self::Layout => "layout",
            Self::Paginate => "paginate",
            Self::Full => "full",
        }
    }
}

fn build_document(tree: &mut RenderTree, paragraphs: usize) -> NodeId {
    let page = tree.create_box(BoxType::LogicalPage);
    let mut segmenter = TextSegmenter::new(Arc::new(HeuristicTextMeasurer));
    let style = Arc::new(TextStyle::default());
    for _ in 0..paragraphs {
        let paragraph = tree.create_box(BoxType::Paragraph);
        let pool = tree.create_box(BoxType::Auto);
        tree.add_child(page, paragraph)
            .unwrap_or_else(|e| panic!("link paragraph: {}", e));
        tree.add_child(paragraph, pool)
            .unwrap_or_else(|e| panic!("link pool: {}", e));
        segmenter.begin_paragraph();
        segmenter
            .segment_into(tree, pool, SAMPLE_TEXT, &style)
            .unwrap_or_else(|e| panic!("segment: {}", e));
    }
    page
}

fn profile(phase: Phase, paragraphs: usize) {
    let config = LayoutConfig::for_page(PAGE_WIDTH, PAGE_HEIGHT);
    let mut tree = RenderTree::with_capacity(paragraphs * 128);
    let page = build_document(&mut tree, paragraphs);
    if phase == Phase::Segment {
        return;
    }

    LayoutEngine::new(config)
        .layout(&mut tree, page)
        .unwrap_or_else(|e| panic!("layout: {}", e));
    if phase == Phase::Layout {
        return;
    }

    let summary = PaginationPass::new(PageGrid::from_config(&config))
        .run(&mut tree, page)
        .unwrap_or_else(|e| panic!("paginate: {}", e));
    eprintln!(
        "  pages={} pushes={} shift={:.1}",
        summary.page_count, summary.pushes, summary.total_shift
    );
    if phase == Phase::Paginate {
        return;
    }

    let snapshot = PageSnapshot::capture(&tree, page).unwrap_or_else(|e| panic!("capture: {}", e));
    let physical = snapshot.split_pages(&PageGrid::from_config(&config));
    if physical.is_empty() {
        panic!("snapshot produced zero physical pages");
    }
}

fn usage() {
    eprintln!("Usage: heap-profile [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --phase <segment|layout|paginate|full>  Pipeline phase to profile (default: full)");
    eprintln!("  --paragraphs <N>                        Paragraphs in the synthetic document (default: 200)");
    eprintln!("  --out-dir <DIR>                         Output directory for dhat JSON (default: target/memory)");
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut phase = Phase::Full;
    let mut paragraphs = 200usize;
    let mut out_dir = PathBuf::from("target/memory");
    let mut i = 0;

    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--phase", Some(value)) => {
                phase = Phase::from_str(value).unwrap_or_else(|| {
                    eprintln!("Unknown phase: {}", value);
                    usage();
                    std::process::exit(1);
                });
                i += 1;
            }
            ("--paragraphs", Some(value)) => {
                paragraphs = value.parse().unwrap_or_else(|_| {
                    eprintln!("Invalid paragraph count: {}", value);
                    std::process::exit(1);
                });
                i += 1;
            }
            ("--out-dir", Some(value)) => {
                out_dir = PathBuf::from(value);
                i += 1;
            }
            ("--help" | "-h", _) => {
                usage();
                std::process::exit(0);
            }
            (other, _) => {
                eprintln!("Unknown argument: {}", other);
                usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    std::fs::create_dir_all(&out_dir).unwrap_or_else(|e| {
        eprintln!("Failed to create output dir {}: {}", out_dir.display(), e);
        std::process::exit(1);
    });

    let json_path = out_dir.join(format!("dhat-{}.json", phase.name()));
    eprintln!(
        "heap-profile: phase={}, paragraphs={}, out={}",
        phase.name(),
        paragraphs,
        out_dir.display()
    );
    {
        let _profiler = dhat::Profiler::builder().file_name(json_path.clone()).build();
        profile(phase, paragraphs);
        // _profiler drops here, writes JSON
    }
    eprintln!(
        "Done. Open {} in https://nnethercote.github.io/dh_view/dh_view.html",
        json_path.display()
    );
}
