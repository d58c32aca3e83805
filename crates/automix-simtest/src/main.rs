//! AutoMix Headless Harness
//!
//! Runs `create`, `mix` and `mix_variants` across many seeds on the bundled
//! catalog and checks the layout invariants every result must satisfy.
//! Runs entirely in-process: no rendering, no persistence.
//!
//! Usage:
//!   cargo run -p automix-simtest
//!   cargo run -p automix-simtest -- --runs 200 --width 80 --verbose
//!   cargo run -p automix-simtest -- --street "sidewalk!normal!6,drive-lane!inbound|car!10,sidewalk!normal!6"

use std::collections::BTreeSet;
use std::path::PathBuf;

use automix_logic::adjacency::upgrade_legacy_variant;
use automix_logic::catalog::{BuiltinCatalog, SegmentCatalog};
use automix_logic::constants::segment_types::TURN_LANE;
use automix_logic::context::MixContext;
use automix_logic::engine::AutoMix;
use automix_logic::error::{AutomixError, AutomixResult};
use automix_logic::operators::{self, LaneCounts};
use automix_logic::rules::RulesConfig;
use automix_logic::sampler::Sampler;
use automix_logic::street::Street;
use automix_logic::validate;
use automix_logic::width::STANDARD;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// AutoMix headless harness
#[derive(Parser)]
#[command(name = "automix-simtest")]
#[command(about = "Checks AutoMix layout invariants across seeded runs", long_about = None)]
struct Args {
    /// Seeded runs per sweep
    #[arg(short, long, default_value_t = 50)]
    runs: u64,

    /// First seed; run i uses seed + i
    #[arg(short, long, default_value_t = 1)]
    seed: u64,

    /// Target street width for the create sweep
    #[arg(short, long, default_value_t = 60.0)]
    width: f64,

    /// Rules JSON; the bundled statistics are used when it carries none
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Extra street to mix, as `type!variant!width` joined by `,`
    #[arg(long)]
    street: Option<String>,

    /// Print passing checks too
    #[arg(short, long)]
    verbose: bool,

    /// Emit the results as JSON instead of text
    #[arg(long)]
    json: bool,
}

// ── Test harness ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

#[derive(Serialize)]
struct Summary<'r> {
    passed: usize,
    failed: usize,
    results: &'r [TestResult],
}

/// Shared inputs for every section.
struct Harness {
    catalog: BuiltinCatalog,
    rules: RulesConfig,
    args: Args,
}

impl Harness {
    fn ctx(&self) -> MixContext<'_> {
        MixContext::new(&self.catalog, &STANDARD, &self.rules)
    }

    fn automix(&self, seed: u64) -> AutomixResult<AutoMix<'_>> {
        AutoMix::new(&self.catalog, &self.rules, Sampler::seeded(seed))
    }

    fn seeds(&self) -> impl Iterator<Item = u64> {
        let first = self.args.seed;
        (0..self.args.runs).map(move |i| first.wrapping_add(i))
    }

    /// Build a street from `type!variant!width` parts.
    fn parse_street(&self, layout: &str) -> Option<Street> {
        let ctx = self.ctx();
        let mut sampler = Sampler::seeded(self.args.seed);
        let mut segments = Vec::new();
        for part in layout.split(',').filter(|p| !p.trim().is_empty()) {
            let mut fields = part.trim().splitn(3, '!');
            let (t, v, w) = (fields.next()?, fields.next()?, fields.next()?);
            let width: f64 = w.parse().ok()?;
            let elevation = ctx.info(t)?.default_elevation;
            segments.push(ctx.segment(&mut sampler, t, v, width, elevation)?);
        }
        let mut street = Street::new(segments.iter().map(|s| s.width).sum());
        street.segments = segments;
        ctx.recalculate(&mut street);
        Some(street)
    }
}

fn main() {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let harness = match load(args) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Failed to load AutoMix data: {e}");
            std::process::exit(2);
        }
    };
    let verbose = harness.args.verbose;
    let json = harness.args.json;
    if !json {
        println!("=== AutoMix Simulation Harness ===\n");
    }

    let mut results = Vec::new();

    // 1. Bundled data consistency
    results.extend(validate_data(&harness));

    // 2. Street creation sweep
    let created = validate_create(&harness, &mut results);

    // 3. Mix sweep over the created streets
    results.extend(validate_mix(&harness, &created));

    // 4. Variant-only mix
    results.extend(validate_variant_mix(&harness, &created));

    // 5. Operator guarantees
    results.extend(validate_operators(&harness, &created));

    // 6. Fixed scenarios
    results.extend(validate_scenarios(&harness));

    // 7. Caller-supplied street
    if let Some(layout) = harness.args.street.as_deref() {
        results.extend(validate_custom_street(&harness, layout));
    }

    // ── Summary ──
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    if json {
        let summary = Summary {
            passed,
            failed,
            results: &results,
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(out) => println!("{out}"),
            Err(e) => eprintln!("Failed to encode results: {e}"),
        }
    } else {
        println!();
        for r in &results {
            let icon = if r.passed { "✓" } else { "✗" };
            if !r.passed || verbose {
                println!("  {} {}: {}", icon, r.name, r.detail);
            }
        }
        println!("\n=== RESULT: {}/{} passed, {} failed ===", passed, total, failed);
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

fn load(args: Args) -> AutomixResult<Harness> {
    let catalog = BuiltinCatalog::bundled()?;
    let bundled = RulesConfig::bundled()?;
    let rules = match &args.rules {
        Some(path) => {
            let rules = RulesConfig::load(path)?;
            if rules.stats.is_empty() {
                rules.with_stats(bundled.stats)
            } else {
                rules
            }
        }
        None => bundled,
    };
    Ok(Harness { catalog, rules, args })
}

fn section(harness: &Harness, title: &str) {
    if !harness.args.json {
        println!("--- {title} ---");
    }
}

// ── 1. Data ─────────────────────────────────────────────────────────────

fn validate_data(harness: &Harness) -> Vec<TestResult> {
    section(harness, "Bundled Data");
    let mut results = Vec::new();
    let catalog = &harness.catalog;
    let rules = &harness.rules;

    results.push(TestResult::new(
        "catalog_not_empty",
        catalog.len() >= 10,
        format!("{} segment types", catalog.len()),
    ));

    let unknown: BTreeSet<String> = rules
        .stats
        .transitions()
        .iter()
        .flat_map(|t| [&t.from.segment_type, &t.to.segment_type])
        .filter(|t| catalog.info(t).is_none())
        .cloned()
        .collect();
    results.push(TestResult::new(
        "stats_types_in_catalog",
        unknown.is_empty(),
        format!("{} transitions, unknown types: {unknown:?}", rules.stats.transitions().len()),
    ));

    let bad_defaults: Vec<&str> = catalog
        .types()
        .into_iter()
        .filter(|t| {
            catalog
                .info(t)
                .and_then(|i| i.rules.as_ref().map(|r| !r.admits(i.default_width)))
                .unwrap_or(false)
        })
        .collect();
    results.push(TestResult::new(
        "default_widths_within_rules",
        bad_defaults.is_empty(),
        format!("violations: {bad_defaults:?}"),
    ));

    let undecodable: Vec<String> = rules
        .variants
        .iter()
        .flat_map(|(t, vs)| vs.iter().map(move |v| (t, v)))
        .filter(|(t, v)| catalog.variant_array(t, v).is_none())
        .map(|(t, v)| format!("{t}:{v}"))
        .collect();
    results.push(TestResult::new(
        "allowed_variants_decodable",
        undecodable.is_empty(),
        format!("undecodable: {undecodable:?}"),
    ));

    results.push(TestResult::new(
        "rules_validate",
        rules.validate().is_ok(),
        format!("maxLoops {}", rules.max_loops),
    ));

    results
}

// ── 2. Create ───────────────────────────────────────────────────────────

fn validate_create(harness: &Harness, results: &mut Vec<TestResult>) -> Vec<Street> {
    section(harness, "Create");
    let width = harness.args.width;
    let mut created = Vec::new();
    let mut exhausted = 0;
    let mut other_errors = Vec::new();
    let mut width_drift = 0;
    let mut rule_breaks = 0;
    let mut bad_ends = 0;
    let mut duplicate_ids = 0;

    for seed in harness.seeds() {
        let mut street = Street::new(width);
        let outcome = harness.automix(seed).and_then(|mut a| a.create(&mut street));
        match outcome {
            Ok(_) => {
                if (street.segments_width() + street.remaining_width - street.width).abs() > 1e-6
                    || street.remaining_width.abs() > 1e-6
                {
                    width_drift += 1;
                }
                if !street.segments.iter().all(|s| validate::segment(&harness.catalog, s)) {
                    rule_breaks += 1;
                }
                if !validate::street(&harness.catalog, &street, &harness.rules) {
                    bad_ends += 1;
                }
                let ids: BTreeSet<_> = street.segments.iter().map(|s| s.id).collect();
                if ids.len() != street.segments.len() {
                    duplicate_ids += 1;
                }
                created.push(street);
            }
            Err(AutomixError::CreationExhausted { .. }) => exhausted += 1,
            Err(e) => other_errors.push(e.to_string()),
        }
    }

    results.push(TestResult::new(
        "create_succeeds_sometimes",
        !created.is_empty(),
        format!("{}/{} created at width {width}, {exhausted} exhausted", created.len(), harness.args.runs),
    ));
    results.push(TestResult::new(
        "create_only_fails_by_exhaustion",
        other_errors.is_empty(),
        format!("{other_errors:?}"),
    ));
    results.push(TestResult::new(
        "create_conserves_width",
        width_drift == 0,
        format!("{width_drift} streets off target"),
    ));
    results.push(TestResult::new(
        "create_respects_width_rules",
        rule_breaks == 0,
        format!("{rule_breaks} streets with out-of-rule segments"),
    ));
    results.push(TestResult::new(
        "create_respects_street_rules",
        bad_ends == 0,
        format!("{bad_ends} streets breaking start/end/count rules"),
    ));
    results.push(TestResult::new(
        "create_ids_unique",
        duplicate_ids == 0,
        format!("{duplicate_ids} streets with repeated ids"),
    ));

    if let Some(street) = created.first() {
        log::debug!("Sample street: {}", street.describe());
    }
    created
}

// ── 3. Mix ──────────────────────────────────────────────────────────────

fn validate_mix(harness: &Harness, created: &[Street]) -> Vec<TestResult> {
    section(harness, "Mix");
    let mut mixed = 0;
    let mut exhausted = 0;
    let mut unchanged = 0;
    let mut warned = 0;
    let mut overflow = 0;
    let mut mutated_on_failure = 0;

    for (street, seed) in created.iter().zip(harness.seeds()) {
        let mut working = street.clone();
        let before = working.clone();
        match harness.automix(seed).and_then(|mut a| a.mix(&mut working)) {
            Ok(_) => {
                mixed += 1;
                if working.fingerprint() == before.fingerprint() {
                    unchanged += 1;
                }
                if working.has_warnings() {
                    warned += 1;
                }
                if working.remaining_width < -1e-6 {
                    overflow += 1;
                }
            }
            Err(_) => {
                exhausted += 1;
                if working != before {
                    mutated_on_failure += 1;
                }
            }
        }
    }

    vec![
        TestResult::new(
            "mix_changes_layout",
            unchanged == 0,
            format!("{mixed} mixed, {exhausted} exhausted, {unchanged} unchanged"),
        ),
        TestResult::new("mix_clears_warnings", warned == 0, format!("{warned} warned results")),
        TestResult::new("mix_never_overflows", overflow == 0, format!("{overflow} overflowing results")),
        TestResult::new(
            "mix_failure_leaves_street",
            mutated_on_failure == 0,
            format!("{mutated_on_failure} failed calls mutated the street"),
        ),
    ]
}

// ── 4. Variant mix ──────────────────────────────────────────────────────

fn validate_variant_mix(harness: &Harness, created: &[Street]) -> Vec<TestResult> {
    section(harness, "Variant Mix");
    let mut mixed = 0;
    let mut reshaped = 0;
    let mut undecodable = 0;

    for (street, seed) in created.iter().zip(harness.seeds()) {
        let mut working = street.clone();
        if harness
            .automix(seed)
            .and_then(|mut a| a.mix_variants(&mut working))
            .is_err()
        {
            continue;
        }
        mixed += 1;
        let shape = |s: &Street| -> Vec<(String, u64)> {
            s.segments
                .iter()
                .map(|x| (x.segment_type.clone(), x.width.to_bits()))
                .collect()
        };
        if shape(&working) != shape(street) {
            reshaped += 1;
        }
        undecodable += working
            .segments
            .iter()
            .filter(|s| harness.catalog.variant_array(&s.segment_type, &s.variant_string).is_none())
            .count();
    }

    vec![
        TestResult::new(
            "variant_mix_keeps_types_and_widths",
            reshaped == 0,
            format!("{mixed} mixed, {reshaped} reshaped"),
        ),
        TestResult::new(
            "variant_mix_decodable",
            undecodable == 0,
            format!("{undecodable} undecodable variants"),
        ),
    ]
}

// ── 5. Operators ────────────────────────────────────────────────────────

fn validate_operators(harness: &Harness, created: &[Street]) -> Vec<TestResult> {
    section(harness, "Operators");
    let ctx = harness.ctx();
    let mut protected_replaced = 0;
    let mut over_cap = 0;
    let mut orphan_turn_lanes = 0;
    let mut lane_totals = LaneCounts::default();

    for (street, seed) in created.iter().zip(harness.seeds()) {
        let mut sampler = Sampler::seeded(seed);
        let len = street.segments.len();

        for target in [0, len.saturating_sub(1)] {
            let mut working = street.clone();
            if operators::replace(&ctx, &mut working, &mut sampler, Some(target)).is_ok() {
                protected_replaced += 1;
            }
        }

        let mut working = street.clone();
        let candidates: Vec<String> = harness.catalog.types().into_iter().map(str::to_string).collect();
        let saturated: Vec<&String> = harness
            .rules
            .max_instances
            .iter()
            .filter(|(t, cap)| working.count_of(t) >= **cap)
            .map(|(t, _)| t)
            .collect();
        let counts: Vec<usize> = saturated.iter().map(|t| working.count_of(t)).collect();
        let _ = operators::insert(&ctx, &mut working, &mut sampler, &candidates);
        over_cap += saturated
            .iter()
            .zip(counts)
            .filter(|(t, before)| working.count_of(t) > *before)
            .count();

        operators::cleanup(&ctx, &mut working);
        orphan_turn_lanes += working
            .segments
            .iter()
            .enumerate()
            .filter(|(i, s)| s.is(TURN_LANE) && !operators::turn_lane_supported(&working.segments, *i))
            .count();

        let counts = LaneCounts::of(street);
        lane_totals.drive_inbound += counts.drive_inbound;
        lane_totals.drive_outbound += counts.drive_outbound;
        lane_totals.sidewalks += counts.sidewalks;
    }

    vec![
        TestResult::new(
            "replace_refuses_ends",
            protected_replaced == 0,
            format!("{protected_replaced} end segments replaced"),
        ),
        TestResult::new("insert_respects_max_instances", over_cap == 0, format!("{over_cap} caps exceeded")),
        TestResult::new(
            "cleanup_removes_orphan_turn_lanes",
            orphan_turn_lanes == 0,
            format!("{orphan_turn_lanes} unsupported turn lanes left"),
        ),
        TestResult::new(
            "lane_mix_observed",
            true,
            format!(
                "{} inbound / {} outbound drive lanes, {} sidewalks",
                lane_totals.drive_inbound, lane_totals.drive_outbound, lane_totals.sidewalks
            ),
        ),
    ]
}

// ── 6. Scenarios ────────────────────────────────────────────────────────

fn validate_scenarios(harness: &Harness) -> Vec<TestResult> {
    section(harness, "Scenarios");
    let mut results = Vec::new();

    let upgraded = upgrade_legacy_variant("bike-lane", "outbound|colored");
    results.push(TestResult::new(
        "legacy_bike_lane_upgrade",
        upgraded == "outbound|green|road",
        upgraded,
    ));

    let mut sampler = Sampler::seeded(harness.args.seed);
    let picked = sampler.select([("a", 0.0), ("b", 0.0)]);
    results.push(TestResult::new(
        "zero_weight_select_is_none",
        picked.is_none(),
        format!("{picked:?}"),
    ));

    if let Some(street) = harness.parse_street(
        "sidewalk!normal!8,parking-lane!inbound|left!8,drive-lane!inbound|car!10,drive-lane!outbound|car!10,sidewalk!normal!8",
    ) {
        let mut street = Street {
            width: street.width - 2.0,
            ..street
        };
        harness.ctx().recalculate(&mut street);
        let mut overflowing = 0;
        let mut bad = 0;
        for seed in harness.seeds() {
            let mut working = street.clone();
            match harness.automix(seed).and_then(|mut a| a.mix(&mut working)) {
                Ok(_) if working.remaining_width >= -1e-6 => {}
                Ok(_) => overflowing += 1,
                Err(AutomixError::MixExhausted { .. }) => {}
                Err(_) => bad += 1,
            }
        }
        results.push(TestResult::new(
            "overflow_mix_recovers",
            overflowing == 0 && bad == 0,
            format!("{overflowing} still overflowing, {bad} unexpected errors"),
        ));
    }

    results
}

// ── 7. Custom street ────────────────────────────────────────────────────

fn validate_custom_street(harness: &Harness, layout: &str) -> Vec<TestResult> {
    section(harness, "Custom Street");
    let Some(street) = harness.parse_street(layout) else {
        return vec![TestResult::new(
            "custom_street_parse",
            false,
            format!("could not build a street from {layout:?}"),
        )];
    };

    let mut working = street.clone();
    let outcome = harness.automix(harness.args.seed).and_then(|mut a| a.mix(&mut working));
    let detail = match &outcome {
        Ok(attempts) => format!("{attempts} attempts: {}", working.describe()),
        Err(e) => e.to_string(),
    };
    vec![TestResult::new(
        "custom_street_mix",
        outcome.as_ref().map_or_else(|e| e.is_retryable(), |_| !working.has_warnings()),
        detail,
    )]
}
