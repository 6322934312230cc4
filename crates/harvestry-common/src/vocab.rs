//! Coded-vocabulary lookup tables.
//!
//! Registry free text is mapped onto fixed integer codes before storage.
//! The tables are immutable and exhaustively matched; unknown "type"-style
//! text falls through to an explicit Other / Not provided code rather than
//! failing. The id values form part of the staging-schema contract and must
//! not be renumbered.

/// Source and organisation ids used across processors.
pub mod org {
    pub const CLINICAL_TRIALS_GOV: i32 = 100120;
    pub const EU_CTR: i32 = 100123;
    pub const ISRCTN: i32 = 100126;
    pub const NIH: i32 = 100134;
    pub const PUBMED: i32 = 100135;
    pub const MERCK: i32 = 100165;
    pub const NHLBI: i32 = 100167;
    pub const GSK: i32 = 100163;
    pub const NIH_CLINICAL_CENTER: i32 = 100360;
    pub const WHO_ICTRP: i32 = 100115;
    pub const TRIALSCOPE: i32 = 101419;
    pub const SERVIER: i32 = 101418;
    pub const BIOLINCC: i32 = 101900;
    pub const YODA: i32 = 101901;
    pub const ANVISA: i32 = 102000;
    pub const CEP_BRAZIL: i32 = 102001;
}

/// Study type codes.
pub fn study_type_id(text: &str) -> i32 {
    match text.trim().to_lowercase().as_str() {
        "interventional"                          => 11,
        "observational"                           => 12,
        "observational patient registry"          => 13,
        "expanded access"                         => 14,
        "funded programme"                        => 15,
        "other"                                   => 16,
        "not yet known" | "" | "not provided"     => 0,
        _                                         => 16,
    }
}

/// Study status codes. "Completed" (21) and "Other" (24) are anchor values
/// relied upon by several processors.
pub fn study_status_id(text: &str) -> i32 {
    match text.trim().to_lowercase().as_str() {
        "not yet recruiting"                      => 11,
        "withdrawn"                               => 12,
        "suspended"                               => 13,
        "enrolling by invitation"                 => 14,
        "recruiting"                              => 15,
        "active, not recruiting" | "active not recruiting" => 16,
        "ongoing" | "in progress"                 => 18,
        "suspended (temporarily halted)" | "temporarily halted" => 13,
        "terminated" | "stopped" | "prematurely ended" => 22,
        "completed" | "complete"                  => 21,
        "other"                                   => 24,
        "" | "unknown" | "unknown status" | "not provided" => 0,
        _                                         => 24,
    }
}

/// Gender eligibility codes.
pub fn gender_elig_id(text: &str) -> i32 {
    match text.trim().to_lowercase().as_str() {
        "all" | "both" | "male and female"        => 900,
        "female" | "women"                        => 905,
        "male" | "men"                            => 910,
        _                                         => 915,
    }
}

pub const GENDER_NOT_PROVIDED: (i32, &str) = (915, "Not provided");

/// Age / time unit codes.
pub fn time_units_id(text: &str) -> i32 {
    match text.trim().to_lowercase().as_str() {
        "hours"                                   => 13,
        "days"                                    => 14,
        "weeks"                                   => 15,
        "months"                                  => 16,
        "years"                                   => 17,
        _                                         => 0,
    }
}

/// Trial phase codes (feature type 20).
pub fn phase_id(text: &str) -> i32 {
    match text.trim().to_lowercase().as_str() {
        "not applicable" | "na" | "n/a"           => 100,
        "early phase 1" | "early phase1"          => 105,
        "phase 1" | "phase1"                      => 110,
        "phase 1/phase 2" | "phase1, phase2"      => 115,
        "phase 2" | "phase2"                      => 120,
        "phase 2/phase 3" | "phase2, phase3"      => 125,
        "phase 3" | "phase3"                      => 130,
        "phase 4" | "phase4"                      => 135,
        _                                         => 140,
    }
}

/// Allocation type codes (feature type 22).
pub fn allocation_type_id(text: &str) -> i32 {
    match text.trim().to_lowercase().as_str() {
        "not applicable" | "na" | "n/a"           => 200,
        "randomized" | "randomised"               => 205,
        "non-randomized" | "non randomized" | "non-randomised" => 210,
        _                                         => 215,
    }
}

/// Intervention model codes (feature type 23).
pub fn design_type_id(text: &str) -> i32 {
    match text.trim().to_lowercase().as_str() {
        "single group assignment" | "single group" => 300,
        "parallel assignment" | "parallel"         => 305,
        "crossover assignment" | "crossover"       => 310,
        "factorial assignment" | "factorial"       => 315,
        "sequential assignment" | "sequential"     => 320,
        _                                          => 325,
    }
}

/// Primary purpose codes (feature type 21).
pub fn primary_purpose_id(text: &str) -> i32 {
    match text.trim().to_lowercase().as_str() {
        "treatment"                               => 400,
        "prevention"                              => 405,
        "diagnostic"                              => 410,
        "supportive care"                         => 415,
        "screening"                               => 420,
        "health services research"                => 425,
        "basic science"                           => 430,
        "device feasibility"                      => 435,
        "other"                                   => 440,
        _                                         => 445,
    }
}

/// Masking codes (feature type 24).
pub fn masking_type_id(text: &str) -> i32 {
    match text.trim().to_lowercase().as_str() {
        "none (open label)" | "none" | "open label" | "open" => 500,
        "single"                                  => 505,
        "double"                                  => 510,
        "triple"                                  => 515,
        "quadruple"                               => 520,
        _                                         => 525,
    }
}

/// Observational model codes (feature type 30).
pub fn obs_model_type_id(text: &str) -> i32 {
    match text.trim().to_lowercase().as_str() {
        "cohort"                                  => 600,
        "case-control" | "case control"           => 605,
        "case-only" | "case only"                 => 610,
        "case-crossover" | "case crossover"       => 615,
        "ecologic or community" | "ecologic or community studies" => 620,
        "family-based" | "family based"           => 625,
        "other"                                   => 630,
        _                                         => 635,
    }
}

/// Time perspective codes (feature type 31).
pub fn time_perspective_id(text: &str) -> i32 {
    match text.trim().to_lowercase().as_str() {
        "retrospective"                           => 700,
        "prospective"                             => 705,
        "cross-sectional" | "cross sectional"     => 710,
        "other"                                   => 715,
        _                                         => 720,
    }
}

/// Biospecimen retention codes (feature type 32).
pub fn biospec_retention_id(text: &str) -> i32 {
    match text.trim().to_lowercase().as_str() {
        "none retained"                           => 800,
        "samples with dna"                        => 805,
        "samples without dna"                     => 810,
        _                                         => 815,
    }
}

/// Registry names for the WHO ICTRP secondary source ids. The WHO dump
/// aggregates records from these national registries; the numeric id travels
/// with each record.
pub fn who_registry_name(source_id: i32) -> &'static str {
    match source_id {
        100116 => "Australian New Zealand Clinical Trials Registry",
        100117 => "Registro Brasileiro de Ensaios Clínicos",
        100118 => "Chinese Clinical Trial Register",
        100119 => "Clinical Research Information Service (South Korea)",
        100120 => "ClinicalTrials.gov",
        100121 => "Clinical Trials Registry - India",
        100122 => "Registro Público Cubano de Ensayos Clínicos",
        100123 => "EU Clinical Trials Register",
        100124 => "Deutschen Register Klinischer Studien",
        100125 => "Iranian Registry of Clinical Trials",
        100126 => "ISRCTN",
        100127 => "Japan Primary Registries Network",
        100128 => "Pan African Clinical Trial Registry",
        100129 => "Registro Peruano de Ensayos Clínicos",
        100130 => "Sri Lanka Clinical Trials Registry",
        100131 => "Thai Clinical Trials Register",
        100132 => "The Netherlands National Trial Register",
        101989 => "Lebanon Clinical Trials Registry",
        _      => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_anchor_codes() {
        assert_eq!(study_status_id("Completed"), 21);
        assert_eq!(study_status_id("Other"), 24);
        assert_eq!(study_status_id("Recruiting"), 15);
    }

    #[test]
    fn test_unknown_type_maps_to_other() {
        assert_eq!(study_type_id("some free text from a registry"), 16);
        assert_eq!(study_type_id(""), 0);
    }

    #[test]
    fn test_gender_codes() {
        assert_eq!(gender_elig_id("All"), 900);
        assert_eq!(gender_elig_id("Both"), 900);
        assert_eq!(gender_elig_id("Female"), 905);
        assert_eq!(gender_elig_id("something else"), 915);
    }

    #[test]
    fn test_time_units() {
        assert_eq!(time_units_id("Years"), 17);
        assert_eq!(time_units_id("months"), 16);
        assert_eq!(time_units_id("fortnights"), 0);
    }

    #[test]
    fn test_phase_fallback_is_not_provided() {
        assert_eq!(phase_id("Phase 2"), 120);
        assert_eq!(phase_id("PHASE3"), 130);
        assert_eq!(phase_id("mystery phase"), 140);
    }

    #[test]
    fn test_who_registry_names() {
        assert_eq!(who_registry_name(100126), "ISRCTN");
        assert_eq!(who_registry_name(999999), "");
    }
}
