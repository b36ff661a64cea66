//! 进程退出钩子
//!
//! Rust 没有运行时退出钩子，这里用一个进程级注册表代替：
//! - [`on_shutdown`] 注册清理动作
//! - [`delete_on_exit`] 登记当前删不掉、退出时重试的路径
//! - [`run_shutdown_hooks`] 依次执行并清空所有动作（每个动作只执行一次）
//! - [`ShutdownGuard`] 在 drop 时调用 `run_shutdown_hooks`，由 `main` 持有
//!
//! 被信号杀死、`process::exit` 或 panic=abort 时钩子不会执行。

use once_cell::sync::Lazy;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

type ShutdownAction = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Registry {
    hooks: Vec<(String, ShutdownAction)>,
    pending_deletions: Vec<PathBuf>,
}

static REGISTRY: Lazy<Mutex<Registry>> = Lazy::new(|| Mutex::new(Registry::default()));

fn registry() -> MutexGuard<'static, Registry> {
    // 钩子 panic 不应让后续注册失效
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 注册退出时执行的清理动作
pub fn on_shutdown<F>(name: impl Into<String>, action: F)
where
    F: FnOnce() + Send + 'static,
{
    let name = name.into();
    tracing::debug!(hook = %name, "注册退出钩子");
    registry().hooks.push((name, Box::new(action)));
}

/// 登记退出时删除的路径
pub fn delete_on_exit(path: impl Into<PathBuf>) {
    let path = path.into();
    tracing::debug!(path = %path.display(), "登记退出时删除");
    registry().pending_deletions.push(path);
}

/// 尚未执行的钩子数量
pub fn pending_hooks() -> usize {
    registry().hooks.len()
}

/// 执行并清空所有已注册的钩子，然后重试登记的删除
///
/// 返回本次执行的钩子数量。重复调用只会执行之后新注册的钩子。
pub fn run_shutdown_hooks() -> usize {
    // 先取出再执行，钩子内部可以继续调用 delete_on_exit
    let hooks = std::mem::take(&mut registry().hooks);
    let count = hooks.len();

    for (name, action) in hooks {
        tracing::debug!(hook = %name, "执行退出钩子");
        if catch_unwind(AssertUnwindSafe(action)).is_err() {
            tracing::error!(hook = %name, "退出钩子 panic");
        }
    }

    let pending = std::mem::take(&mut registry().pending_deletions);
    for path in pending {
        if let Err(e) = remove_path(&path) {
            tracing::warn!(path = %path.display(), error = %e, "退出时删除失败");
        }
    }

    count
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// 退出守卫，drop 时执行所有退出钩子
#[must_use = "守卫被立即 drop 会马上执行退出钩子"]
#[derive(Debug)]
pub struct ShutdownGuard {
    _private: (),
}

/// 创建退出守卫
pub fn guard() -> ShutdownGuard {
    ShutdownGuard { _private: () }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        let count = run_shutdown_hooks();
        tracing::debug!(count, "退出钩子执行完成");
    }
}
