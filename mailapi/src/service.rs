use crate::mailer::{Mail, Mailer};
use mailrpc_core::Result;
use mailrpc_macros::RpcParams;
use mailrpc_server::{RequestContext, RpcService, ServiceMethod};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Clone, Serialize, Deserialize, RpcParams)]
pub struct SendMailRequest {
    pub message: String,
}

/// Sends each request's message as an HTML mail to a fixed recipient
pub struct MailService<M> {
    mailer: M,
    from: String,
    to: String,
    subject: String,
}

impl<M: Mailer> MailService<M> {
    pub fn new(
        mailer: M,
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            mailer,
            from: from.into(),
            to: to.into(),
            subject: subject.into(),
        }
    }

    pub async fn send_mail(&self, _ctx: RequestContext, req: SendMailRequest) -> Result<bool> {
        self.mailer
            .send(Mail {
                from: self.from.clone(),
                to: self.to.clone(),
                subject: self.subject.clone(),
                html_body: req.message,
            })
            .await?;
        Ok(true)
    }
}

impl<M: Mailer> RpcService for MailService<M> {
    fn methods(self: Arc<Self>) -> Vec<ServiceMethod> {
        vec![ServiceMethod::bound(
            &self,
            "SendMail",
            |svc, ctx, req| async move { svc.send_mail(ctx, req).await },
        )]
    }
}
