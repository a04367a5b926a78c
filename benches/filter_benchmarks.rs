use std::sync::Arc;
use std::time::Instant;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use certdeck::catalog::{Card, CardId, Catalog, Domain};
use certdeck::engine::confidence::{ConfidenceLevel, ConfidenceTracking};
use certdeck::engine::filter::visible_cards;
use certdeck::engine::scoring::domain_coverage;
use certdeck::engine::selection::{DomainSelection, StudyFilter, StudyMode};
use certdeck::session::state::StudyState;

fn make_catalog(domains: usize, cards_per_domain: usize) -> Catalog {
    let domain_list: Vec<Domain> = (0..domains)
        .map(|d| Domain {
            id: format!("domain-{d}"),
            number: format!("{}.0", d + 1),
            color: "blue".to_string(),
        })
        .collect();
    let cards = (0..domains)
        .flat_map(|d| {
            (0..cards_per_domain).map(move |n| Card {
                id: CardId::new(format!("d{}-{n:04}", d + 1)),
                question: format!("question {n}"),
                answer: format!("answer {n}"),
                domain: format!("domain-{d}"),
                domain_number: String::new(),
                objective: format!("{}.1", d + 1),
                color: "blue".to_string(),
            })
        })
        .collect();
    Catalog::from_parts(domain_list, cards).unwrap()
}

// Every third card rated, cycling through the buckets.
fn make_tracking(catalog: &Catalog) -> ConfidenceTracking {
    let mut tracking = ConfidenceTracking::new();
    for (i, card) in catalog.cards().iter().enumerate().filter(|(i, _)| i % 3 == 0) {
        tracking.classify(&card.id, ConfidenceLevel::ALL[i % 4]);
    }
    tracking
}

fn bench_visible_cards(c: &mut Criterion) {
    let catalog = make_catalog(5, 400);
    let tracking = make_tracking(&catalog);
    let two_domains = DomainSelection::from(vec!["domain-1".to_string(), "domain-3".to_string()]);

    c.bench_function("visible_cards study/unanswered (2000 cards)", |b| {
        b.iter(|| {
            visible_cards(
                black_box(catalog.cards()),
                &DomainSelection::All,
                StudyMode::Study,
                &[],
                &tracking,
                StudyFilter::Unanswered,
            )
        })
    });

    c.bench_function("visible_cards review/weak, 2 domains (2000 cards)", |b| {
        b.iter(|| {
            visible_cards(
                black_box(catalog.cards()),
                &two_domains,
                StudyMode::Review,
                &ConfidenceLevel::WEAK,
                &tracking,
                StudyFilter::All,
            )
        })
    });
}

fn bench_coverage(c: &mut Criterion) {
    let catalog = make_catalog(5, 400);
    let tracking = make_tracking(&catalog);

    c.bench_function("domain_coverage (2000 cards)", |b| {
        b.iter(|| domain_coverage(black_box(&catalog), black_box(&tracking)))
    });
}

fn bench_rating_pass(c: &mut Criterion) {
    let catalog = Arc::new(make_catalog(5, 100));

    c.bench_function("rate every card, unanswered filter (500 cards)", |b| {
        b.iter(|| {
            let mut state = StudyState::new(Arc::clone(&catalog));
            state.change_study_filter(StudyFilter::Unanswered);
            let now = Instant::now();
            while state.rate_current(black_box(ConfidenceLevel::QuickThink), now) {}
            state.score()
        })
    });
}

criterion_group!(benches, bench_visible_cards, bench_coverage, bench_rating_pass);
criterion_main!(benches);
