use chrono::NaiveDate;

use postmort_core::{
    ConfigError, LabelSet, Layer, Predicate, Record, ResolutionStatus, RootCause, RuleDef,
    RulesFile, TemporalPeriod, BOUNDARY_COUNT,
};

use crate::error::TaggingError;
use crate::rules::{CompiledPredicate, EvalContext};

/// Priority assigned to the rules synthesized from the boundary dates.
/// Explicit temporal rules can run before them by picking a lower value.
const BOUNDARY_RULE_PRIORITY: u32 = 10;

/// A rule ready to run: compiled condition plus its typed label.
#[derive(Debug)]
struct CompiledRule<L> {
    name: String,
    priority: u32,
    when: CompiledPredicate,
    label: L,
    confidence: f32,
    can_co_occur: bool,
}

/// What one layer concluded about one record.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerOutcome<L> {
    pub label: L,
    pub secondary: Option<L>,
    pub confidence: f32,
    /// Name of the rule that set the primary label; `None` when the layer
    /// fell back to its unknown label.
    pub rule: Option<String>,
}

impl<L: LabelSet> LayerOutcome<L> {
    /// Outcome for a record no rule matched: the layer's designated unknown
    /// label at zero confidence.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            label: L::fallback(),
            secondary: None,
            confidence: 0.0,
            rule: None,
        }
    }
}

/// Per-layer results for one record. Layers fail independently: a predicate
/// error in one leaves the other two standing.
pub struct LayerResults {
    pub temporal: Result<LayerOutcome<TemporalPeriod>, TaggingError>,
    pub resolution: Result<LayerOutcome<ResolutionStatus>, TaggingError>,
    pub root_cause: Result<LayerOutcome<RootCause>, TaggingError>,
}

/// The three layer programs, sorted and ready to evaluate.
#[derive(Debug)]
pub struct RuleEngine {
    temporal: Vec<CompiledRule<TemporalPeriod>>,
    resolution: Vec<CompiledRule<ResolutionStatus>>,
    root_cause: Vec<CompiledRule<RootCause>>,
}

impl RuleEngine {
    /// Builds the engine from a rules file.
    ///
    /// The five boundary dates become ordinary date-range rules on the
    /// temporal layer, so all three layers share one evaluation path.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` for a bad boundary list or a label
    /// outside its layer's vocabulary.
    pub fn from_config(config: &RulesFile) -> Result<Self, ConfigError> {
        let mut temporal = boundary_rules(&config.boundaries)?;
        let mut resolution = Vec::new();
        let mut root_cause = Vec::new();

        for rule in &config.rules {
            match rule.layer {
                Layer::TemporalPeriod => temporal.push(compile_rule(rule)?),
                Layer::ResolutionStatus => resolution.push(compile_rule(rule)?),
                Layer::RootCauseCategory => root_cause.push(compile_rule(rule)?),
            }
        }

        // stable sort keeps declaration order between equal priorities
        temporal.sort_by_key(|rule| rule.priority);
        resolution.sort_by_key(|rule| rule.priority);
        root_cause.sort_by_key(|rule| rule.priority);

        Ok(Self {
            temporal,
            resolution,
            root_cause,
        })
    }

    /// Evaluates all three layers against one record.
    #[must_use]
    pub fn evaluate(&self, record: &Record) -> LayerResults {
        let ctx = EvalContext::new(record);
        LayerResults {
            temporal: evaluate_layer(&self.temporal, &ctx),
            resolution: evaluate_layer(&self.resolution, &ctx),
            root_cause: evaluate_layer(&self.root_cause, &ctx),
        }
    }
}

/// Turns the boundary dates `b0..b4` into one date-range rule per period.
///
/// `b0` is the corpus start and only documents the window: classification
/// clamps anything before `b1` into `pre_launch`. Every span is half-open,
/// so equal adjacent boundaries yield an empty (never-matching) period.
fn boundary_rules(
    boundaries: &[NaiveDate],
) -> Result<Vec<CompiledRule<TemporalPeriod>>, ConfigError> {
    if boundaries.len() != BOUNDARY_COUNT {
        return Err(ConfigError::Validation(format!(
            "expected {BOUNDARY_COUNT} period boundaries, found {}",
            boundaries.len()
        )));
    }
    for pair in boundaries.windows(2) {
        if pair[1] < pair[0] {
            return Err(ConfigError::Validation(format!(
                "period boundaries must be non-decreasing: {} follows {}",
                pair[1], pair[0]
            )));
        }
    }

    let spans = [
        (TemporalPeriod::PreLaunch, None, Some(boundaries[1])),
        (
            TemporalPeriod::EarlyAdoption,
            Some(boundaries[1]),
            Some(boundaries[2]),
        ),
        (
            TemporalPeriod::Plateau,
            Some(boundaries[2]),
            Some(boundaries[3]),
        ),
        (
            TemporalPeriod::Decline,
            Some(boundaries[3]),
            Some(boundaries[4]),
        ),
        (TemporalPeriod::PostDiscontinuation, Some(boundaries[4]), None),
    ];

    Ok(spans
        .into_iter()
        .map(|(period, from, to)| CompiledRule {
            name: period.as_str().to_string(),
            priority: BOUNDARY_RULE_PRIORITY,
            when: CompiledPredicate::compile(&Predicate::DateRange { from, to }),
            label: period,
            confidence: 1.0,
            can_co_occur: false,
        })
        .collect())
}

fn compile_rule<L: LabelSet>(rule: &RuleDef) -> Result<CompiledRule<L>, ConfigError> {
    let label = L::parse(&rule.label).ok_or_else(|| {
        ConfigError::Validation(format!(
            "rule '{}' labels {} as '{}', which is not in that layer's vocabulary",
            rule.name,
            L::LAYER,
            rule.label
        ))
    })?;
    Ok(CompiledRule {
        name: rule.name.clone(),
        priority: rule.priority,
        when: CompiledPredicate::compile(&rule.when),
        label,
        confidence: rule.confidence,
        can_co_occur: rule.can_co_occur,
    })
}

/// First match in priority order sets the primary label; the scan then
/// continues, and the first later match that allows co-occurrence and
/// carries a different label becomes the secondary. An evaluation error in
/// any consulted rule degrades the whole layer for this record.
fn evaluate_layer<L: LabelSet>(
    rules: &[CompiledRule<L>],
    ctx: &EvalContext<'_>,
) -> Result<LayerOutcome<L>, TaggingError> {
    let mut primary: Option<&CompiledRule<L>> = None;
    let mut secondary = None;

    for rule in rules {
        if !rule.when.eval(ctx)? {
            continue;
        }
        match primary {
            None => primary = Some(rule),
            Some(first) => {
                if rule.can_co_occur && rule.label != first.label {
                    secondary = Some(rule.label);
                    break;
                }
            }
        }
    }

    Ok(primary.map_or_else(LayerOutcome::fallback, |rule| LayerOutcome {
        label: rule.label,
        secondary,
        confidence: rule.confidence,
        rule: Some(rule.name.clone()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use postmort_core::{AnonymizationConfig, Metadata, SourceKind};

    fn boundaries(dates: [&str; 5]) -> Vec<NaiveDate> {
        dates.iter().map(|d| d.parse().unwrap()).collect()
    }

    fn study_boundaries() -> Vec<NaiveDate> {
        boundaries([
            "2022-09-01",
            "2023-03-01",
            "2023-12-31",
            "2024-06-30",
            "2024-12-31",
        ])
    }

    fn make_rule(name: &str, layer: Layer, label: &str, when: Predicate) -> RuleDef {
        RuleDef {
            name: name.to_string(),
            layer,
            priority: 50,
            when,
            label: label.to_string(),
            confidence: 0.9,
            can_co_occur: false,
        }
    }

    fn make_file(rules: Vec<RuleDef>) -> RulesFile {
        RulesFile {
            boundaries: study_boundaries(),
            anonymization: AnonymizationConfig::default(),
            rules,
        }
    }

    fn make_record(timestamp: Option<&str>, text: &str) -> Record {
        Record {
            source: SourceKind::Issue,
            id: "7".to_string(),
            timestamp: timestamp.and_then(postmort_core::parse_timestamp),
            raw_text: text.to_string(),
            author_id: "author".to_string(),
            url: None,
            metadata: Metadata::default(),
        }
    }

    fn engine(rules: Vec<RuleDef>) -> RuleEngine {
        RuleEngine::from_config(&make_file(rules)).unwrap()
    }

    #[test]
    fn timestamps_map_onto_their_periods() {
        let engine = engine(vec![]);
        let cases = [
            ("2023-02-01T00:00:00Z", TemporalPeriod::PreLaunch),
            ("2021-01-01T00:00:00Z", TemporalPeriod::PreLaunch), // clamped below b0
            ("2023-04-01T00:00:00Z", TemporalPeriod::EarlyAdoption),
            ("2024-01-15T00:00:00Z", TemporalPeriod::Plateau),
            ("2024-06-30T00:00:00Z", TemporalPeriod::Decline), // boundary belongs right
            ("2024-08-15T00:00:00Z", TemporalPeriod::Decline),
            ("2025-03-01T00:00:00Z", TemporalPeriod::PostDiscontinuation),
        ];
        for (ts, expected) in cases {
            let outcome = engine.evaluate(&make_record(Some(ts), "")).temporal.unwrap();
            assert_eq!(outcome.label, expected, "timestamp {ts}");
            assert!((outcome.confidence - 1.0).abs() < f32::EPSILON);
            assert_eq!(outcome.rule.as_deref(), Some(expected.as_str()));
        }
    }

    #[test]
    fn equal_adjacent_boundaries_make_an_empty_period() {
        let file = RulesFile {
            boundaries: boundaries([
                "2023-03-01",
                "2023-06-30",
                "2024-06-30",
                "2024-06-30",
                "2024-12-31",
            ]),
            anonymization: AnonymizationConfig::default(),
            rules: vec![],
        };
        let engine = RuleEngine::from_config(&file).unwrap();
        let outcome = engine
            .evaluate(&make_record(Some("2024-08-15T00:00:00Z"), ""))
            .temporal
            .unwrap();
        // plateau is [2024-06-30, 2024-06-30), i.e. unmatchable
        assert_eq!(outcome.label, TemporalPeriod::Decline);
    }

    #[test]
    fn decreasing_boundaries_fail_construction() {
        let file = RulesFile {
            boundaries: boundaries([
                "2022-09-01",
                "2023-12-31",
                "2023-03-01",
                "2024-06-30",
                "2024-12-31",
            ]),
            anonymization: AnonymizationConfig::default(),
            rules: vec![],
        };
        let err = RuleEngine::from_config(&file).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("non-decreasing")));
    }

    #[test]
    fn missing_timestamp_falls_back_to_unknown_at_zero_confidence() {
        let engine = engine(vec![]);
        let outcome = engine.evaluate(&make_record(None, "")).temporal.unwrap();
        assert_eq!(outcome, LayerOutcome::fallback());
        assert_eq!(outcome.label, TemporalPeriod::Unknown);
        assert!((outcome.confidence - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn lower_priority_value_wins_and_ties_keep_declaration_order() {
        let mut early = make_rule(
            "explicit_wontfix",
            Layer::ResolutionStatus,
            "wontfix",
            Predicate::Contains("wontfix".to_string()),
        );
        early.priority = 10;
        let first_tie = make_rule(
            "first_tie",
            Layer::ResolutionStatus,
            "abandoned",
            Predicate::Contains("stale".to_string()),
        );
        let second_tie = make_rule(
            "second_tie",
            Layer::ResolutionStatus,
            "acknowledged_not_fixed",
            Predicate::Contains("stale".to_string()),
        );
        // declared after but sorted before by priority
        let engine = engine(vec![first_tie, second_tie, early]);

        let outcome = engine
            .evaluate(&make_record(None, "stale, closing as wontfix"))
            .resolution
            .unwrap();
        assert_eq!(outcome.label, ResolutionStatus::Wontfix);
        assert_eq!(outcome.rule.as_deref(), Some("explicit_wontfix"));

        let outcome = engine
            .evaluate(&make_record(None, "marked stale by the bot"))
            .resolution
            .unwrap();
        assert_eq!(outcome.label, ResolutionStatus::Abandoned);
        assert_eq!(outcome.rule.as_deref(), Some("first_tie"));
    }

    #[test]
    fn co_occurring_rule_becomes_the_secondary_label() {
        let primary = make_rule(
            "explicit_wontfix",
            Layer::ResolutionStatus,
            "wontfix",
            Predicate::Contains("wontfix".to_string()),
        );
        let mut rider = make_rule(
            "workaround_posted",
            Layer::ResolutionStatus,
            "acknowledged_not_fixed",
            Predicate::Contains("workaround".to_string()),
        );
        rider.priority = 60;
        rider.can_co_occur = true;

        let outcome = engine(vec![primary, rider])
            .evaluate(&make_record(
                None,
                "wontfix; the workaround above unblocks people",
            ))
            .resolution
            .unwrap();
        assert_eq!(outcome.label, ResolutionStatus::Wontfix);
        assert_eq!(outcome.secondary, Some(ResolutionStatus::AcknowledgedNotFixed));
    }

    #[test]
    fn later_match_without_co_occur_is_ignored() {
        let primary = make_rule(
            "closed_unfixed",
            Layer::ResolutionStatus,
            "acknowledged_not_fixed",
            Predicate::Contains("closing this".to_string()),
        );
        let mut rider = make_rule(
            "stale_open",
            Layer::ResolutionStatus,
            "abandoned",
            Predicate::Contains("stale".to_string()),
        );
        rider.priority = 60;

        let outcome = engine(vec![primary, rider])
            .evaluate(&make_record(None, "closing this; it went stale"))
            .resolution
            .unwrap();
        assert_eq!(outcome.secondary, None);
    }

    #[test]
    fn co_occurring_same_label_does_not_become_secondary() {
        let primary = make_rule(
            "wontfix_label",
            Layer::ResolutionStatus,
            "wontfix",
            Predicate::Contains("wontfix".to_string()),
        );
        let mut echo = make_rule(
            "wontfix_phrase",
            Layer::ResolutionStatus,
            "wontfix",
            Predicate::Contains("won't fix".to_string()),
        );
        echo.priority = 60;
        echo.can_co_occur = true;

        let outcome = engine(vec![primary, echo])
            .evaluate(&make_record(None, "wontfix; we won't fix this"))
            .resolution
            .unwrap();
        assert_eq!(outcome.label, ResolutionStatus::Wontfix);
        assert_eq!(outcome.secondary, None);
    }

    #[test]
    fn no_matching_rule_yields_the_layer_fallback() {
        let engine = engine(vec![make_rule(
            "debt",
            Layer::RootCauseCategory,
            "technical_debt",
            Predicate::Contains("memory leak".to_string()),
        )]);
        let results = engine.evaluate(&make_record(None, "how do I install this?"));
        let outcome = results.root_cause.unwrap();
        assert_eq!(outcome.label, RootCause::Unclear);
        assert_eq!(outcome.rule, None);
        assert!((outcome.confidence - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn predicate_error_degrades_only_its_own_layer() {
        let bad = make_rule(
            "bad_regex",
            Layer::RootCauseCategory,
            "technical_debt",
            Predicate::Matches("(unclosed".to_string()),
        );
        let good = make_rule(
            "wontfix_phrase",
            Layer::ResolutionStatus,
            "wontfix",
            Predicate::Contains("wontfix".to_string()),
        );
        let results =
            engine(vec![bad, good]).evaluate(&make_record(Some("2024-08-15T00:00:00Z"), "wontfix"));
        assert!(results.root_cause.is_err());
        assert_eq!(
            results.resolution.unwrap().label,
            ResolutionStatus::Wontfix
        );
        assert_eq!(results.temporal.unwrap().label, TemporalPeriod::Decline);
    }

    #[test]
    fn unknown_label_for_layer_fails_construction() {
        let rule = make_rule(
            "mislabeled",
            Layer::RootCauseCategory,
            "fixed",
            Predicate::Contains("x".to_string()),
        );
        let err = RuleEngine::from_config(&make_file(vec![rule])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("mislabeled")));
    }

    #[test]
    fn explicit_temporal_rules_merge_with_boundary_rules() {
        let mut launch_week = make_rule(
            "launch_week_push",
            Layer::TemporalPeriod,
            "early_adoption",
            Predicate::Contains("launch week".to_string()),
        );
        launch_week.priority = 5; // ahead of the boundary rules
        let engine = engine(vec![launch_week]);

        // text match overrides what the timestamp alone would say
        let outcome = engine
            .evaluate(&make_record(
                Some("2024-08-15T00:00:00Z"),
                "found during launch week testing",
            ))
            .temporal
            .unwrap();
        assert_eq!(outcome.label, TemporalPeriod::EarlyAdoption);
        assert_eq!(outcome.rule.as_deref(), Some("launch_week_push"));
    }
}
