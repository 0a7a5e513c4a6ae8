pub mod auth_service;
pub use auth_service::{AuthError, AuthService, LoginResult, Principal, UserInfo};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod match_service;
pub use match_service::{MatchError, MatchService, RecordedResult};

pub mod match_service_impl;
pub use match_service_impl::SeaOrmMatchService;

pub mod prediction_service;
pub use prediction_service::{PredictionError, PredictionService};

pub mod prediction_service_impl;
pub use prediction_service_impl::SeaOrmPredictionService;

pub mod ranking_service;
pub use ranking_service::{RankingError, RankingService, SeaOrmRankingService, Standing};

pub mod settlement;
pub use settlement::{SettlementEngine, SettlementSummary};

pub mod import_service;
pub use import_service::{
    FixtureImportSummary, ImportError, ImportService, ResultImportSummary,
};

pub mod import_service_impl;
pub use import_service_impl::DefaultImportService;
