/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时处理的答题会话数量
    pub max_concurrent_attempts: usize,
    /// 浏览器调试端口（监考模式使用）
    pub browser_debug_port: u16,
    /// 是否启用浏览器全屏监考
    pub proctoring_enabled: bool,
    /// 考试界面 URL（监考模式下定位页面用）
    pub exam_page_url: String,
    /// 答题脚本存放目录
    pub script_folder: String,
    /// 答案本地缓存目录
    pub answer_cache_folder: String,
    /// 自动保存防抖间隔（毫秒）
    pub autosave_debounce_ms: u64,
    /// 计时器刷新间隔（毫秒）
    pub timer_tick_ms: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- 考试服务 API 配置 ---
    pub exam_api_base_url: String,
    pub exam_api_token: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_attempts: 4,
            browser_debug_port: 2001,
            proctoring_enabled: false,
            exam_page_url: "http://localhost:3000/exams".to_string(),
            script_folder: "attempt_scripts".to_string(),
            answer_cache_folder: "answer_cache".to_string(),
            autosave_debounce_ms: 500,
            timer_tick_ms: 1000,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            exam_api_base_url: "http://localhost:8386".to_string(),
            exam_api_token: String::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_attempts: std::env::var("MAX_CONCURRENT_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_attempts),
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            proctoring_enabled: std::env::var("PROCTORING_ENABLED").ok().and_then(|v| v.parse().ok()).unwrap_or(default.proctoring_enabled),
            exam_page_url: std::env::var("EXAM_PAGE_URL").unwrap_or(default.exam_page_url),
            script_folder: std::env::var("SCRIPT_FOLDER").unwrap_or(default.script_folder),
            answer_cache_folder: std::env::var("ANSWER_CACHE_FOLDER").unwrap_or(default.answer_cache_folder),
            autosave_debounce_ms: std::env::var("AUTOSAVE_DEBOUNCE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.autosave_debounce_ms),
            timer_tick_ms: std::env::var("TIMER_TICK_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.timer_tick_ms),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            exam_api_base_url: std::env::var("EXAM_API_BASE_URL").unwrap_or(default.exam_api_base_url),
            exam_api_token: std::env::var("EXAM_API_TOKEN").unwrap_or(default.exam_api_token),
        }
    }
}
