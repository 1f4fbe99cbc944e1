pub mod config_manager;
pub mod dashboard_presenter;
pub mod error;
pub mod gemini_api;
pub mod insight_post_processor;
pub mod insight_request_builder;
pub mod review_data_manager;
pub mod review_insight_analyzer;
pub mod review_preview;
pub mod review_session;
pub mod spreadsheet_reader;

#[cfg(test)]
mod test_support;

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
mod desktop {
    use log::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tauri::{AppHandle, Emitter, Manager};
    use tokio::sync::Mutex;

    use crate::config_manager::{self, ConfigManager};
    use crate::dashboard_presenter::DashboardView;
    use crate::error::ReviewInsightError;
    use crate::review_data_manager;
    use crate::review_insight_analyzer::{AnalysisProgress, ReviewInsightAnalyzer};
    use crate::review_preview::ReviewPreview;
    use crate::review_session::ReviewSession;

    fn to_user_error(e: ReviewInsightError) -> String {
        match &e {
            // 초기화 뒤 늦게 도착한 결과. 웹뷰는 이 메시지를 무시한다.
            ReviewInsightError::StaleAnalysis => info!("{}", e),
            _ => error!("{}", e),
        }
        e.user_message()
    }

    #[tauri::command]
    async fn load_review_file_command(
        app_handle: AppHandle,
        file_path: String,
    ) -> Result<ReviewPreview, String> {
        let path = PathBuf::from(&file_path);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| to_user_error(ReviewInsightError::Io(e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.clone());

        // 파싱은 CPU 작업이라 블로킹 스레드에서 처리
        let reviews = tokio::task::spawn_blocking(move || {
            review_data_manager::load_reviews(&file_name, &bytes)
        })
        .await
        .map_err(|e| to_user_error(ReviewInsightError::Parse(e.to_string())))?
        .map_err(to_user_error)?;

        let session = app_handle.state::<Arc<Mutex<ReviewSession>>>();
        let mut session = session.lock().await;
        session.load(reviews).map_err(to_user_error)?;
        session
            .preview()
            .ok_or_else(|| to_user_error(ReviewInsightError::NoReviewsLoaded))
    }

    #[tauri::command]
    async fn get_review_preview_command(
        app_handle: AppHandle,
    ) -> Result<Option<ReviewPreview>, String> {
        let session = app_handle.state::<Arc<Mutex<ReviewSession>>>();
        let preview = session.lock().await.preview();
        Ok(preview)
    }

    #[tauri::command]
    async fn analyze_reviews_command(app_handle: AppHandle) -> Result<DashboardView, String> {
        let session = app_handle.state::<Arc<Mutex<ReviewSession>>>();
        let ticket = session.lock().await.begin_analysis().map_err(to_user_error)?;

        let config_manager = app_handle.state::<Arc<Mutex<ConfigManager>>>();
        let gemini_config = config_manager.lock().await.config.gemini.clone();

        let app_handle_for_progress = app_handle.clone();
        let on_progress = Box::new(move |progress: AnalysisProgress| {
            let _ = app_handle_for_progress.emit("analysis_progress", &progress);
        });
        let analyzer = ReviewInsightAnalyzer::new(gemini_config).with_progress_callback(on_progress);

        // 네트워크 호출 중에는 세션 잠금을 잡지 않는다
        let outcome = analyzer.analyze(&ticket.reviews).await;

        let result = session
            .lock()
            .await
            .finish_analysis(ticket.generation, outcome)
            .map_err(to_user_error)?;
        Ok(DashboardView::from_result(&result))
    }

    #[tauri::command]
    async fn get_dashboard_command(app_handle: AppHandle) -> Result<Option<DashboardView>, String> {
        let session = app_handle.state::<Arc<Mutex<ReviewSession>>>();
        let dashboard = session.lock().await.dashboard();
        Ok(dashboard)
    }

    #[tauri::command]
    async fn reset_session_command(app_handle: AppHandle) -> Result<(), String> {
        let session = app_handle.state::<Arc<Mutex<ReviewSession>>>();
        session.lock().await.reset();
        let _ = app_handle.emit("session_reset", serde_json::json!({ "status": "reset" }));
        Ok(())
    }

    #[tauri::command]
    async fn export_report_command(app_handle: AppHandle, file_path: String) -> Result<(), String> {
        let session = app_handle.state::<Arc<Mutex<ReviewSession>>>();
        let report = session.lock().await.report().map_err(to_user_error)?;

        tokio::fs::write(&file_path, report)
            .await
            .map_err(|e| to_user_error(ReviewInsightError::Io(e)))?;
        info!("리포트 저장 완료: {}", file_path);
        Ok(())
    }

    #[cfg_attr(mobile, tauri::mobile_entry_point)]
    pub fn run() {
        tauri::Builder::default()
            .plugin(
                tauri_plugin_log::Builder::new()
                    .level(log::LevelFilter::Info)
                    .build(),
            )
            .plugin(tauri_plugin_opener::init())
            .plugin(tauri_plugin_dialog::init())
            .setup(|app| {
                let app_handle = app.handle().clone();

                // 1. ConfigManager 초기화
                let config_dir = app_handle.path().app_config_dir()?;
                let config_manager = ConfigManager::new(&config_dir)?;
                info!("설정 파일: {}", config_manager.config_path().display());
                app_handle.manage(Arc::new(Mutex::new(config_manager)));

                // 2. 세션 상태 (메모리에만 보관)
                app_handle.manage(Arc::new(Mutex::new(ReviewSession::new())));

                info!("Naver Review Insight v{} 시작", env!("CARGO_PKG_VERSION"));
                Ok(())
            })
            .invoke_handler(tauri::generate_handler![
                config_manager::get_config,
                load_review_file_command,
                get_review_preview_command,
                analyze_reviews_command,
                get_dashboard_command,
                reset_session_command,
                export_report_command,
            ])
            .run(tauri::generate_context!())
            .expect("error while running tauri application");
    }
}
