/// Column-name constants for the water balance tables.
/// Single source of truth - exported to Python via PyO3.

// ── Parameter columns ───────────────────────────────────────────────────────
pub mod parameters {
    pub const BUCKET_ID: &str = "bucket_id";
    pub const CODE: &str = "code";
    pub const LAYER_ORDER: &str = "layer_order";
    pub const VALUE: &str = "value";
    pub const UNIT_CODE: &str = "unit_code";

    pub const REQUIRED: [&str; 4] = [BUCKET_ID, CODE, LAYER_ORDER, VALUE];

    // Parameter codes read by the unit itself
    pub const H_TARGET: &str = "hTarget";
    pub const H_BOTTOM: &str = "hBottom";
}

// ── Input series columns ────────────────────────────────────────────────────
pub mod series {
    pub const PRECIPITATION: &str = "prec";
    pub const EVAPORATION: &str = "evap";
    pub const SEEPAGE: &str = "seepage";
    pub const LEAKAGE: &str = "leakage";
    pub const INTAKE: &str = "intake";
    pub const OUTTAKE: &str = "outtake";
}

// ── Raw flux kinds ──────────────────────────────────────────────────────────
pub mod flux {
    // Aggregator's own fluxes
    pub const PRECIPITATION: &str = "p";
    pub const EVAPORATION: &str = "e";
    pub const SEEPAGE: &str = "s";
    pub const LEAKAGE: &str = "w";
    pub const INTAKE: &str = "x";
    pub const OUTTAKE: &str = "q_out";

    // Bucket fluxes, suffixed with the bucket id on the aggregator
    pub const OUTFLOW: &str = "q_oa";
    pub const VERTICAL: &str = "q_ui";

    /// Column name of a bucket flux on the aggregator, e.g. `q_oa_2`.
    pub fn column(kind: &str, bucket_id: i64) -> String {
        format!("{kind}_{bucket_id}")
    }
}

// ── Aggregated categories ───────────────────────────────────────────────────
pub mod category {
    pub const PRECIPITATION: &str = "precipitation";
    pub const EVAPORATION: &str = "evaporation";
    pub const SEEPAGE_IN: &str = "seepage_in";
    pub const SEEPAGE_OUT: &str = "seepage_out";
    pub const INTAKE: &str = "intake";
    pub const OUTTAKE: &str = "outtake";
    pub const PAVED_RUNOFF: &str = "paved_runoff";
    pub const LEACHING: &str = "leaching";
    pub const INFILTRATION: &str = "infiltration";
    pub const SURFACE_RUNOFF: &str = "surface_runoff";
    pub const DRAINAGE: &str = "drainage";

    pub const ALL: [&str; 11] = [
        PRECIPITATION,
        EVAPORATION,
        SEEPAGE_IN,
        SEEPAGE_OUT,
        INTAKE,
        OUTTAKE,
        PAVED_RUNOFF,
        LEACHING,
        INFILTRATION,
        SURFACE_RUNOFF,
        DRAINAGE,
    ];

    /// Loss terms making up the outgoing volume of the chloride balance.
    pub const OUTGOING: [&str; 3] = [INFILTRATION, OUTTAKE, SEEPAGE_OUT];
}

// ── Storage columns ─────────────────────────────────────────────────────────
pub mod storage {
    pub const STORAGE: &str = "storage";
}

// ── Chloride balance columns ────────────────────────────────────────────────
pub mod chloride {
    pub const MASS: &str = "chloride_mass";
    pub const CONCENTRATION: &str = "chloride_concentration";
}

// ── Time series columns ─────────────────────────────────────────────────────
pub mod timeseries {
    pub const DATE_TIME: &str = "date_time";
}
