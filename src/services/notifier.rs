// src/services/notifier.rs

use async_trait::async_trait;

// Evento de notificação disparado quando um pedido muda de status.
// Cada evento tem seu próprio template de mensagem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
    Paid,
    Confirmed,
    OutForDelivery,
}

impl OrderEvent {
    pub fn message(self, order_id: i64, customer_name: &str) -> String {
        match self {
            OrderEvent::Paid => format!(
                "Olá {customer_name}! Recebemos o pagamento do pedido #{order_id}. Obrigado!"
            ),
            OrderEvent::Confirmed => format!(
                "Olá {customer_name}! Seu pedido #{order_id} foi confirmado e já está em preparação."
            ),
            OrderEvent::OutForDelivery => format!(
                "Olá {customer_name}! Seu pedido #{order_id} saiu para entrega."
            ),
        }
    }
}

// Porta de notificação: fire-and-forget, disparada DEPOIS do commit da
// transição. Falha aqui nunca desfaz nem bloqueia a mudança de status —
// quem chama só loga o erro.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        phone: &str,
        event: OrderEvent,
        order_id: i64,
        customer_name: &str,
    ) -> anyhow::Result<()>;
}

// Implementação via gateway HTTP de SMS.
pub struct SmsNotifier {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    sender: String,
}

impl SmsNotifier {
    pub fn new(api_url: String, api_key: String, sender: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            sender,
        }
    }
}

#[async_trait]
impl Notifier for SmsNotifier {
    async fn notify(
        &self,
        phone: &str,
        event: OrderEvent,
        order_id: i64,
        customer_name: &str,
    ) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "from": self.sender,
            "to": phone,
            "message": event.message(order_id, customer_name),
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("apiKey", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("gateway de SMS respondeu {}", response.status());
        }

        tracing::debug!(order_id, "SMS de {:?} enviado", event);
        Ok(())
    }
}

// Usado quando o gateway não está configurado no ambiente: descarta a
// mensagem logando em debug.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(
        &self,
        phone: &str,
        event: OrderEvent,
        order_id: i64,
        _customer_name: &str,
    ) -> anyhow::Result<()> {
        tracing::debug!(order_id, phone, "SMS desabilitado; evento {:?} descartado", event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cada_evento_tem_template_proprio() {
        let paid = OrderEvent::Paid.message(42, "Ana");
        let confirmed = OrderEvent::Confirmed.message(42, "Ana");
        let delivery = OrderEvent::OutForDelivery.message(42, "Ana");

        assert!(paid.contains("pagamento do pedido #42"));
        assert!(confirmed.contains("confirmado"));
        assert!(delivery.contains("saiu para entrega"));
        assert_ne!(paid, confirmed);
        assert_ne!(confirmed, delivery);
    }
}
