//! アプリケーション状態

use crate::staging::ImageSlots;
use safety_lens_common::IncidentReport;

/// 掃描フローの段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Step {
    #[default]
    Upload,
    Processing,
    Review,
}

/// 表示中の画面
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Scan,
    History,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub view: ViewMode,
    pub step: Step,
    /// 送信待ちの写真（永続化しない）
    pub staged: ImageSlots,
    /// 確認・編集中の報告
    pub current: Option<IncidentReport>,
    /// 紀錄画面用のキャッシュ（ストア更新のたびに差し替え）
    pub history: Vec<IncidentReport>,
    /// 解析失敗などユーザーへ表示するエラー
    pub error: Option<String>,
    /// 直近のストア操作の失敗（キャッシュは前回の内容のまま）
    pub storage_warning: Option<String>,
    /// 最後に保存できた時刻（epochミリ秒）
    pub last_saved: Option<i64>,
}

impl AppState {
    pub fn is_busy(&self) -> bool {
        self.step == Step::Processing
    }

    /// 掃描フローを初期状態へ戻す
    pub(crate) fn reset_scan(&mut self) {
        self.step = Step::Upload;
        self.current = None;
        self.staged.clear();
        self.error = None;
        self.last_saved = None;
    }
}
