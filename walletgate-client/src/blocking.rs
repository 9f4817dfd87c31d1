//! Blocking facade over [`WalletClient`].
//!
//! A dedicated worker thread owns a current-thread tokio runtime and the
//! async client; every call ships a job over a channel and waits for its
//! result. This keeps the facade usable from plain synchronous code without
//! the caller managing a runtime.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::runtime::Runtime;
use walletgate_core::{
    AddTokenRequest, BalanceResponse, SignatureResponse, StatusResponse, TransactionRequest,
    TransactionResult, WalletInfo,
};

use crate::client::WalletClient;
use crate::error::ClientError;

type Job = Box<dyn FnOnce(&Runtime, &Arc<WalletClient>) + Send>;

enum Command {
    Run(Job),
    Shutdown,
}

/// Blocking wallet client.
///
/// # Example
///
/// ```rust,no_run
/// use walletgate_client::{WalletClient, WalletClientSync};
///
/// # fn main() -> Result<(), walletgate_client::ClientError> {
/// let client = WalletClient::builder()
///     .base_url("http://127.0.0.1:8545")
///     .app_name("Reporting Tool")
///     .app_url("https://reports.example")
///     .permissions(["wallet_info", "balance"])
///     .build()?;
///
/// let wallet = WalletClientSync::new(client)?;
/// let info = wallet.connect()?;
/// println!("connected to {}", info.truncated_address);
/// let balance = wallet.balance("currency")?;
/// println!("balance: {}", balance.balance);
/// wallet.close();
/// # Ok(())
/// # }
/// ```
pub struct WalletClientSync {
    sender: mpsc::Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl WalletClientSync {
    /// Spawn the worker thread and runtime around an async client.
    pub fn new(client: WalletClient) -> Result<Self, ClientError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to build runtime: {}", e)))?;

        let client = Arc::new(client);
        let (sender, receiver) = mpsc::channel::<Command>();
        let worker = std::thread::Builder::new()
            .name("walletgate-client".to_string())
            .spawn(move || {
                while let Ok(command) = receiver.recv() {
                    match command {
                        Command::Run(job) => job(&runtime, &client),
                        Command::Shutdown => break,
                    }
                }
            })
            .map_err(|e| {
                ClientError::Configuration(format!("failed to spawn worker thread: {}", e))
            })?;

        Ok(Self {
            sender,
            worker: Some(worker),
        })
    }

    /// See [`WalletClient::status`].
    pub fn status(&self) -> Result<StatusResponse, ClientError> {
        self.call(|rt, client| rt.block_on(client.status()))
    }

    /// See [`WalletClient::connect`]. Blocks through the whole approval
    /// poll, which can take as long as the user takes to decide.
    pub fn connect(&self) -> Result<WalletInfo, ClientError> {
        self.call(|rt, client| rt.block_on(client.connect()))
    }

    /// See [`WalletClient::wallet_info`].
    pub fn wallet_info(&self) -> Result<WalletInfo, ClientError> {
        self.call(|rt, client| rt.block_on(client.wallet_info()))
    }

    /// See [`WalletClient::balance`].
    pub fn balance(&self, contract: &str) -> Result<BalanceResponse, ClientError> {
        let contract = contract.to_string();
        self.call(move |rt, client| rt.block_on(client.balance(&contract)))
    }

    /// See [`WalletClient::send_transaction`].
    pub fn send_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<TransactionResult, ClientError> {
        self.call(move |rt, client| rt.block_on(client.send_transaction(&request)))
    }

    /// See [`WalletClient::sign_message`].
    pub fn sign_message(&self, message: &str) -> Result<SignatureResponse, ClientError> {
        let message = message.to_string();
        self.call(move |rt, client| rt.block_on(client.sign_message(&message)))
    }

    /// See [`WalletClient::add_token`].
    pub fn add_token(&self, request: AddTokenRequest) -> Result<(), ClientError> {
        self.call(move |rt, client| rt.block_on(client.add_token(&request)))
    }

    /// See [`WalletClient::disconnect`].
    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.call(|rt, client| rt.block_on(client.disconnect()))
    }

    /// Stop the worker thread and wait for it to finish. Dropping the
    /// client does the same; `close` only makes the join explicit.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn call<T, F>(&self, op: F) -> Result<T, ClientError>
    where
        T: Send + 'static,
        F: FnOnce(&Runtime, &Arc<WalletClient>) -> Result<T, ClientError> + Send + 'static,
    {
        let worker_gone = || ClientError::Configuration("client worker has shut down".into());

        let (tx, rx) = mpsc::channel();
        self.sender
            .send(Command::Run(Box::new(move |rt, client| {
                let _ = tx.send(op(rt, client));
            })))
            .map_err(|_| worker_gone())?;
        rx.recv().map_err(|_| worker_gone())?
    }

    fn shutdown(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for WalletClientSync {
    fn drop(&mut self) {
        self.shutdown();
    }
}
