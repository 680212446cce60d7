use std::{
    io::ErrorKind,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, LazyLock, OnceLock},
    time::Duration,
};

use clap::Parser;

use super::client::{self, RawResponse};
use crate::{cli::Args, server::ADDR_FILE_NAME};

#[derive(Debug, Clone)]
pub(super) struct Runtime {
    _data_dir: PathBuf,
    addr: SocketAddr,
}

impl Runtime {
    #[inline(always)]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[inline(always)]
    pub async fn get(&self, path_and_query: &str) -> RawResponse {
        client::get(self.addr, path_and_query).await
    }

    #[inline(always)]
    pub async fn get_with_read_delay(
        &self,
        path_and_query: &str,
        read_delay: Duration,
    ) -> RawResponse {
        client::get_with_read_delay(self.addr, path_and_query, read_delay).await
    }
}

/// Runtime shared by all tests, sessions must therefore use unique ids.
pub(super) async fn get() -> Runtime {
    static APP: LazyLock<PathBuf> = LazyLock::new(spawn_stutter_app);
    runtime_for(APP.clone()).await
}

/// Runtime with a fresh session registry, for tests which rely on shared ids.
pub(super) async fn spawn() -> Runtime {
    runtime_for(spawn_stutter_app()).await
}

async fn runtime_for(data_dir: PathBuf) -> Runtime {
    let addr = tokio::time::timeout(
        Duration::from_secs(30),
        read_file_or_wait(data_dir.join(format!("{ADDR_FILE_NAME}.addr.txt"))),
    )
    .await
    .unwrap();

    Runtime {
        _data_dir: data_dir,
        addr,
    }
}

async fn read_file_or_wait(path: PathBuf) -> SocketAddr {
    loop {
        match tokio::fs::read_to_string(&path).await {
            Ok(s) => {
                let s = s.trim();
                if s.is_empty() {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                }
                match s.parse() {
                    Ok(addr) => return addr,
                    Err(err) => {
                        eprintln!("unexpected error parsing socket addr (content={s:?}): {err}");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        continue;
                    }
                }
            }
            Err(err) => {
                if err.kind() == ErrorKind::NotFound {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                } else {
                    panic!("unexpected error: {err}");
                }
            }
        }
    }
}

fn spawn_stutter_app() -> PathBuf {
    let data_dir = crate::test::tmp_dir::try_new("stutter_app_e2e").unwrap();
    eprintln!("stutter_app_e2e data stored under: {data_dir:?}");

    let data_dir_str = data_dir.display().to_string();

    let args = Args::try_parse_from([
        crate::utils::env::project_name(),
        "--bind",
        "127.0.0.1:0",
        "--data",
        data_dir_str.as_str(),
        "--graceful",
        "0.1",
    ])
    .unwrap();

    let wait_server_ready = Arc::new(OnceLock::new());
    let notify_server_ready = wait_server_ready.clone();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let server_future = crate::cli::run_with_args(std::future::pending::<()>(), args);

        notify_server_ready.set(()).expect("waiter to be notified");

        rt.block_on(server_future).expect("serve without errors");
    });

    wait_server_ready.wait();

    data_dir
}
