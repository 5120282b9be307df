use clap::Parser;
use std::path::Path;
use survey_scorer::{ai_provider, batch, clean, cli, config, error, scorer, table};
use ai_provider::AiProvider;
use batch::{CheckpointStore, ScoreJob};
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use table::SurveyTable;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "survey_scorer=debug" } else { "survey_scorer=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Score(args) => {
            println!("📝 survey-scorer - 回答採点\n");

            // 設定の読み込みも採点失敗として扱う（終了コード1）
            let prepared = Config::config_path().and_then(|path| args.prepare(&path, !cli.verbose));
            let ok = match prepared {
                Ok((config, job)) => process_survey(cli.ai_provider, &config, &job).await,
                Err(e) => {
                    error!(error = %e, "Could not prepare scoring run");
                    false
                }
            };

            if !ok {
                eprintln!("\n❌ 採点に失敗しました（詳細はログを参照）");
                std::process::exit(1);
            }
        }

        Commands::Clean { input, output } => {
            println!("🧹 survey-scorer - 回答の前処理\n");

            let table = SurveyTable::read(&input)?;
            let cleaned = clean::clean_table(&table)?;
            let output = output.unwrap_or_else(|| cleaned_path(&input));
            cleaned.write(&output)?;

            println!("✔ {}行を処理: {}", cleaned.len(), output.display());
        }

        Commands::Checkpoint { input, backup_dir, reset } => {
            let backup_dir = backup_dir.unwrap_or_else(|| CheckpointStore::default_backup_dir(&input));
            let store = CheckpointStore::new(&backup_dir);

            if reset {
                if store.reset()? {
                    println!("✔ チェックポイントを削除しました: {}", store.checkpoint_path().display());
                } else {
                    println!("チェックポイントが存在しません");
                }
            } else {
                match store.read_state() {
                    Some(state) => {
                        println!("チェックポイント情報:");
                        println!("  パス: {}", store.checkpoint_path().display());
                        println!("  完了行: {}", state.last_processed_row);
                        println!("  次の開始行: {}", state.last_processed_row + 1);
                        if let Some(updated) = state.updated_at {
                            println!("  更新日時: {}", updated);
                        }
                    }
                    None => println!("チェックポイントが存在しません: {}", store.checkpoint_path().display()),
                }
            }
        }

        Commands::Config { set_api_key, show } => {
            let mut config = Config::load()?;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if show {
                println!("設定:");
                println!("  モデル: {}", config.model_for(cli.ai_provider));
                println!("  温度: {}", config.temperature);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  行ごとの待機: {}秒", config.row_delay_seconds);
                println!("  APIキー: {}", if config.api_key.is_some() { "設定済み" } else { "未設定" });
            }
        }
    }

    Ok(())
}

/// 採点を実行し、成否を返す（エラーはここでログに残して握りつぶす）
async fn process_survey(provider: AiProvider, config: &Config, job: &ScoreJob) -> bool {
    let result: Result<batch::BatchReport> = async {
        println!("[1/3] バックエンドを準備中... ({:?})", provider);
        let backend = scorer::Backend::from_config(provider, config)?;
        let scorer = scorer::Scorer::new(backend);

        println!("[2/3] 採点中... {}", job.input.display());
        let report = batch::score_file(&scorer, job).await?;
        Ok::<_, error::ScorerError>(report)
    }
    .await;

    match result {
        Ok(report) => {
            println!("[3/3] 結果を保存");
            println!("✔ 採点済み: {}", job.output_path().display());
            println!("✔ サマリー: {}", job.summary_path().display());
            println!(
                "  処理 {}行 / 再開スキップ {}行 / 全 {}行 (呼び出し失敗 {}件)",
                report.processed_rows, report.resumed_rows, report.total_rows, report.failed_calls
            );
            if report.completed {
                println!("\n✅ 採点完了");
            } else {
                println!("\n⏸ 行数上限で停止しました。再実行すると続きから処理します");
            }
            true
        }
        Err(e) => {
            error!(error = %e, "Scoring run failed");
            false
        }
    }
}

fn cleaned_path(input: &Path) -> std::path::PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "survey".to_string());
    input.with_file_name(format!("{}_cleaned.csv", stem))
}
