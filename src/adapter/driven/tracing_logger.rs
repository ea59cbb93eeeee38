use crate::domain::port::Logger;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// 追加コンテキストを `key=value` 形式で連結する（キー順で安定させる）
fn format_context(context: Option<HashMap<String, String>>) -> String {
    let Some(context) = context else {
        return String::new();
    };
    let mut pairs: Vec<(String, String)> = context.into_iter().collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// tracingによるロガー実装
/// 出力先とフォーマットはmainで設定したサブスクライバーに任せる
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }

    fn emit(
        &self,
        level: LogLevel,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        let correlation_id = correlation_id.map(|id| id.to_string()).unwrap_or_default();
        let context = format_context(context);

        match level {
            LogLevel::Debug => tracing::debug!(component, %correlation_id, %context, "{}", message),
            LogLevel::Info => tracing::info!(component, %correlation_id, %context, "{}", message),
            LogLevel::Warning => tracing::warn!(component, %correlation_id, %context, "{}", message),
            LogLevel::Error => tracing::error!(component, %correlation_id, %context, "{}", message),
        }
    }
}

impl Logger for TracingLogger {
    fn debug(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.emit(LogLevel::Debug, component, message, correlation_id, context);
    }

    fn info(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.emit(LogLevel::Info, component, message, correlation_id, context);
    }

    fn warn(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.emit(LogLevel::Warning, component, message, correlation_id, context);
    }

    fn error(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.emit(LogLevel::Error, component, message, correlation_id, context);
    }
}
