pub mod consts {
    /// One row of a built-in text template: expected word, where it sits on a
    /// reference receipt, and how much it counts toward the score.
    #[derive(Debug, Clone, Copy)]
    pub struct FieldSpec {
        pub text: &'static str,
        pub left: i32,
        pub top: i32,
        pub weight: f64,
    }

    pub const SENT_VARIANT: &str = "sent";
    pub const RECEIVED_VARIANT: &str = "received";

    pub const SENT_TEMPLATE: [FieldSpec; 12] = [
        FieldSpec { text: "Interbank", left: 338, top: 80, weight: 1.5 },
        FieldSpec { text: "exitoso", left: 404, top: 347, weight: 1.5 },
        FieldSpec { text: "S/", left: 201, top: 428, weight: 1.2 },
        FieldSpec { text: "Enviado", left: 102, top: 615, weight: 1.3 },
        FieldSpec { text: "Destino", left: 102, top: 798, weight: 1.3 },
        FieldSpec { text: "Yape", left: 100, top: 852, weight: 1.2 },
        FieldSpec { text: "Comision", left: 101, top: 928, weight: 1.2 },
        FieldSpec { text: "GRATIS", left: 117, top: 991, weight: 1.1 },
        FieldSpec { text: "Fecha", left: 102, top: 1078, weight: 1.2 },
        FieldSpec { text: "hora", left: 248, top: 1078, weight: 1.2 },
        FieldSpec { text: "Codigo", left: 101, top: 1207, weight: 1.3 },
        FieldSpec { text: "operacion", left: 293, top: 1207, weight: 1.3 },
    ];

    pub const RECEIVED_TEMPLATE: [FieldSpec; 8] = [
        FieldSpec { text: "Interbank", left: 338, top: 80, weight: 1.5 },
        FieldSpec { text: "Pago", left: 293, top: 348, weight: 1.5 },
        FieldSpec { text: "exitoso", left: 404, top: 347, weight: 1.5 },
        FieldSpec { text: "S/", left: 201, top: 428, weight: 1.2 },
        FieldSpec { text: "Recibiste", left: 103, top: 426, weight: 1.3 },
        FieldSpec { text: "Destino", left: 102, top: 798, weight: 1.3 },
        FieldSpec { text: "Fecha", left: 102, top: 1078, weight: 1.2 },
        FieldSpec { text: "Codigo", left: 101, top: 1207, weight: 1.3 },
    ];

    // Template matcher
    pub const CANDIDATE_TEXT_THRESHOLD: f64 = 0.4;
    pub const ACCEPT_THRESHOLD: f64 = 0.55;
    pub const TEXT_WEIGHT: f64 = 0.75;
    pub const POSITION_WEIGHT: f64 = 0.25;
    pub const MAX_POSITION_DISTANCE: f64 = 250.0;

    // Region locator
    pub const WHITE_THRESHOLD: f64 = 240.0;
    pub const BLUR_KERNEL: i32 = 5;
    pub const MIN_REGION_AREA: f64 = 1000.0;

    // Mark search
    pub const WORKING_SCALE: f64 = 0.6;
    pub const SCALE_MIN: f64 = 0.3;
    pub const SCALE_MAX: f64 = 2.0;
    pub const SCALE_STEPS: usize = 30;
    pub const MIN_MARK_SIDE: i32 = 10;
    pub const SUBMITTED_MARK_THRESHOLD: f64 = 0.60;
    pub const REFERENCE_MARK_THRESHOLD: f64 = 0.65;

    // Recognition
    pub const OCR_SPACE_URL: &str = "https://api.ocr.space/parse/image";
    pub const OCR_TIMEOUT_SECS: u64 = 30;
    pub const MAX_OCR_SIDE: i32 = 2000;
    pub const MIN_CROP_SIDE: i32 = 100;

    pub const DEFAULT_MARK_PATH: &str = "assets/marks/plin.jpg";
    pub const DEFAULT_REFERENCE_DIR: &str = "assets/references";
    pub const REFERENCE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

    pub const KNOWN_DESTINATIONS: [&str; 17] = [
        "Yape",
        "Plin",
        "BCP",
        "Interbank",
        "BBVA",
        "Scotiabank",
        "Caja Arequipa",
        "Caja Huancayo",
        "Caja Piura",
        "Caja Cusco",
        "Caja Trujillo",
        "MiBanco",
        "Banco de la Nación",
        "Caja Sullana",
        "Caja Tacna",
        "Caja Metropolitana",
        "Banco Pichincha",
    ];
}

pub mod analyzer;
pub mod batch;
pub mod classification;
pub mod config;
pub mod error;
pub mod geometry;
pub mod ocr;
pub mod prefilter;
pub mod text;
pub mod utils;
pub mod vision;

pub use analyzer::ReceiptAnalyzer;
pub use classification::{Classification, VerificationReport};
pub use config::VerifierConfig;
pub use error::{ErrorKind, Result, VerifyError};
