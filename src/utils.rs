//! 浏览器环境辅助：控制台日志与 panic hook。

/// 输出到浏览器控制台；非 wasm 目标下不输出，避免原生测试调用 JS 导入函数。
#[macro_export]
macro_rules! console_log {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "wasm32")]
        {
            $crate::utils::log_line(&format!($($arg)*));
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}

#[cfg(target_arch = "wasm32")]
pub fn log_line(message: &str) {
    web_sys::console::log_1(&message.into());
}

#[cfg(feature = "console_error_panic_hook")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
pub fn set_panic_hook() {}
