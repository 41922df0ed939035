//! ログイン処理
//!
//! 画面の状態を順に待つステートマシン。資格情報の再送は行わない。

use tracing::{debug, info, warn};

use crate::config::AuthCredentials;
use crate::error::ScraperError;
use crate::session::BrowserSession;
use crate::traits::{BrowserDriver, Locator};

const USERNAME_FIELD: &str = "username";
const PASSWORD_FIELD: &str = "password";
const DASHBOARD_READY_ID: &str = "horizontal-nav-item-reservations";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    Start,
    AwaitingIdentityField,
    AwaitingSecretField,
    AwaitingDashboard,
    Authenticated,
}

pub struct Authenticator<'a> {
    credentials: &'a AuthCredentials,
    debug: bool,
}

impl<'a> Authenticator<'a> {
    pub fn new(credentials: &'a AuthCredentials) -> Self {
        Self {
            credentials,
            debug: false,
        }
    }

    /// タイムアウト時にスクリーンショットをログに残す
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// ダッシュボードが表示されるまでログインを進める
    pub async fn login<D: BrowserDriver>(
        &self,
        session: &BrowserSession<D>,
    ) -> Result<(), ScraperError> {
        info!("Starting login process");
        let mut stage = LoginStage::Start;
        while stage != LoginStage::Authenticated {
            stage = self.step(session, stage).await?;
            debug!("Login stage: {:?}", stage);
        }
        info!("Login successful!");
        Ok(())
    }

    /// 1段階進めて次の状態を返す
    pub async fn step<D: BrowserDriver>(
        &self,
        session: &BrowserSession<D>,
        stage: LoginStage,
    ) -> Result<LoginStage, ScraperError> {
        match stage {
            LoginStage::Start => {
                info!("Navigating to {}", self.credentials.url);
                session.goto(&self.credentials.url).await?;
                Ok(LoginStage::AwaitingIdentityField)
            }
            LoginStage::AwaitingIdentityField => {
                let field = Locator::name(USERNAME_FIELD);
                self.wait_for_form_field(session, &field).await?;
                info!("Entering email: {}", self.credentials.identity);
                session.submit_text(&field, &self.credentials.identity).await?;
                Ok(LoginStage::AwaitingSecretField)
            }
            LoginStage::AwaitingSecretField => {
                let field = Locator::name(PASSWORD_FIELD);
                self.wait_for_form_field(session, &field).await?;
                info!("Entering password...");
                session.submit_text(&field, &self.credentials.secret).await?;
                Ok(LoginStage::AwaitingDashboard)
            }
            LoginStage::AwaitingDashboard => {
                info!("Waiting for dashboard to load...");
                let timeout = session.timeouts().dashboard;
                match session
                    .wait_for(&Locator::id(DASHBOARD_READY_ID), Some(timeout))
                    .await
                {
                    Ok(()) => Ok(LoginStage::Authenticated),
                    Err(ScraperError::PresenceTimeout { .. }) => {
                        // 認証失敗とサーバー遅延はここでは区別できない
                        warn!("Dashboard marker not found after {:?}", timeout);
                        if self.debug {
                            session.log_screenshot("Login").await;
                        }
                        Err(ScraperError::AuthenticationTimeout { timeout })
                    }
                    Err(e) => Err(e),
                }
            }
            LoginStage::Authenticated => Ok(LoginStage::Authenticated),
        }
    }

    async fn wait_for_form_field<D: BrowserDriver>(
        &self,
        session: &BrowserSession<D>,
        field: &Locator,
    ) -> Result<(), ScraperError> {
        session.wait_for(field, None).await.map_err(|e| match e {
            ScraperError::PresenceTimeout { locator, timeout } => {
                ScraperError::LoginFormNotFound { locator, timeout }
            }
            other => other,
        })
    }
}
