/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Player registry and leaderboard operations.
pub mod player_service;
/// Session lifecycle, scores and match recording.
pub mod session_service;
/// Storage connection supervisor with retry and degraded mode.
pub mod storage_supervisor;
/// Background polling loop reconciling the shared session document.
pub mod synchronizer;
