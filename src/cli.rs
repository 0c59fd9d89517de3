use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "safety-lens")]
#[command(about = "安老院意外報告AI分析・紀錄管理工具", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 紀錄の保存先（設定ファイルより優先）
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 報告書の写真（1〜2枚）を解析して紀錄に保存
    Analyze {
        /// 第1頁の写真
        #[arg(required = true)]
        page1: PathBuf,

        /// 第2頁の写真
        page2: Option<PathBuf>,

        /// 確認画面を開かずに結果を表示して終了
        #[arg(long)]
        no_review: bool,

        /// CSVの出力先ディレクトリ（デフォルト: カレント）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 紀錄の一覧・表示・編集・削除
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// 報告をCSVファイルに出力
    Export {
        /// 報告ID
        #[arg(required = true)]
        id: String,

        /// 出力先ディレクトリ（デフォルト: カレント）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 報告をタブ区切りでクリップボードへ複製
    Copy {
        /// 報告ID
        #[arg(required = true)]
        id: String,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// 紀錄一覧（新しい順）
    List,

    /// 報告の全項目を表示
    Show {
        #[arg(required = true)]
        id: String,
    },

    /// 報告を確認画面で開く
    Open {
        #[arg(required = true)]
        id: String,

        /// CSVの出力先ディレクトリ（デフォルト: カレント）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 報告を削除
    Delete {
        #[arg(required = true)]
        id: String,

        /// 確認せずに削除
        #[arg(short, long)]
        yes: bool,
    },
}
