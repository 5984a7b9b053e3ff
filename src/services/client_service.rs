// src/services/client_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        csv,
        error::AppError,
        pagination::{Page, Pagination},
    },
    db::{client_repo::ClientRecord, interaction_repo::NewInteraction, ClientRepository, InteractionRepository},
    middleware::rbac,
    models::{
        auth::Actor,
        client::{
            clean_optional, parse_property_value, Client, ClientDetail, ClientFilter, ClientSearchParams,
            ClientStatus, CreateClientPayload, FollowUpState, UpdateClientPayload,
        },
        interaction::CLIENT_CREATED,
    },
};

const DEFAULT_SOURCE: &str = "manual";

#[derive(Clone)]
pub struct ClientService {
    client_repo: ClientRepository,
    interaction_repo: InteractionRepository,
    pool: PgPool,
}

impl ClientService {
    pub fn new(client_repo: ClientRepository, interaction_repo: InteractionRepository, pool: PgPool) -> Self {
        Self {
            client_repo,
            interaction_repo,
            pool,
        }
    }

    // Cria o cliente e o evento CLIENT_CREATED na mesma transação
    pub async fn create_client(&self, actor: &Actor, payload: CreateClientPayload) -> Result<Client, AppError> {
        let record = build_record(payload)?;

        let mut tx = self.pool.begin().await?;

        let client = self.client_repo.create(&mut *tx, actor.user_id, &record).await?;
        self.interaction_repo
            .insert(
                &mut *tx,
                &NewInteraction {
                    client_id: client.id,
                    user_id: actor.user_id,
                    kind: CLIENT_CREATED,
                    observation: None,
                    from_status: None,
                    to_status: Some(client.status.as_str()),
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Cliente {} criado por {}", client.id, actor.user_id);
        Ok(client)
    }

    pub async fn list_clients(
        &self,
        actor: &Actor,
        params: &ClientSearchParams,
        pagination: Pagination,
    ) -> Result<Page<Client>, AppError> {
        let filter = build_filter(actor, params)?;

        let items = self
            .client_repo
            .search(&filter, Some(pagination.page_size), pagination.offset())
            .await?;
        let total = self.client_repo.count(&filter).await?;

        Ok(Page {
            items,
            page: pagination.page,
            page_size: pagination.page_size,
            total,
        })
    }

    // Mesmo escopo e filtros da listagem, sem paginação
    pub async fn export_csv(&self, actor: &Actor, params: &ClientSearchParams) -> Result<String, AppError> {
        let filter = build_filter(actor, params)?;
        let clients = self.client_repo.search(&filter, None, 0).await?;

        tracing::info!("📄 Exportando {} clientes para {}", clients.len(), actor.user_id);
        Ok(csv::write_document(&Client::CSV_HEADER, clients.iter().map(Client::csv_row)))
    }

    pub async fn get_client_detail(&self, actor: &Actor, id: Uuid) -> Result<ClientDetail, AppError> {
        let client = self.load_authorized(actor, id).await?;
        let interactions = self.interaction_repo.list_by_client(client.id).await?;

        Ok(ClientDetail { client, interactions })
    }

    // Atualização parcial. Não grava interação.
    pub async fn update_client(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: UpdateClientPayload,
    ) -> Result<Client, AppError> {
        let client = self.load_authorized(actor, id).await?;

        let mut record = ClientRecord::from(&client);
        apply_patch(&mut record, patch)?;

        self.client_repo.update(&self.pool, client.id, &record).await
    }

    pub async fn delete_client(&self, actor: &Actor, id: Uuid) -> Result<(), AppError> {
        // 404 antes de 403
        self.client_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("Client"))?;
        rbac::decide_delete(actor.role).into_result()?;

        if !self.client_repo.delete(id).await? {
            return Err(AppError::NotFound("Client"));
        }

        tracing::info!("🗑️ Cliente {} excluído por {}", id, actor.user_id);
        Ok(())
    }

    async fn load_authorized(&self, actor: &Actor, id: Uuid) -> Result<Client, AppError> {
        let client = self
            .client_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("Client"))?;
        rbac::decide(actor.role, client.owner_id, actor.user_id).into_result()?;
        Ok(client)
    }
}

fn build_filter(actor: &Actor, params: &ClientSearchParams) -> Result<ClientFilter, AppError> {
    let status = params
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<ClientStatus>)
        .transpose()
        .map_err(AppError::Validation)?;

    Ok(ClientFilter {
        owner_id: rbac::visibility_scope(actor),
        query: clean_optional(params.q.clone()),
        status,
    })
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    clean_optional(value).ok_or_else(|| AppError::Validation(format!("{} é obrigatório", field)))
}

fn parse_status(raw: &str) -> Result<ClientStatus, AppError> {
    raw.parse().map_err(AppError::Validation)
}

fn parse_follow_up(raw: &str) -> Result<FollowUpState, AppError> {
    raw.parse().map_err(AppError::Validation)
}

fn build_record(payload: CreateClientPayload) -> Result<ClientRecord, AppError> {
    let status = match payload.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_status(raw)?,
        None => ClientStatus::default(),
    };
    let follow_up_state = match payload.follow_up_state.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_follow_up(raw)?,
        None => FollowUpState::default(),
    };

    Ok(ClientRecord {
        name: required(payload.name, "name")?,
        phone: required(payload.phone, "phone")?,
        email: clean_optional(payload.email),
        source: clean_optional(payload.source).unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        status,
        observations: clean_optional(payload.observations),
        product: clean_optional(payload.product),
        property_value: payload.property_value.as_ref().and_then(parse_property_value),
        follow_up_state,
    })
}

// Só os campos presentes mudam; nada é gravado se algum for inválido
fn apply_patch(record: &mut ClientRecord, patch: UpdateClientPayload) -> Result<(), AppError> {
    if let Some(raw) = patch.status {
        record.status = parse_status(raw.trim())?;
    }
    if let Some(raw) = patch.follow_up_state {
        record.follow_up_state = parse_follow_up(raw.trim())?;
    }
    if let Some(name) = patch.name {
        record.name = required(Some(name), "name")?;
    }
    if let Some(phone) = patch.phone {
        record.phone = required(Some(phone), "phone")?;
    }
    if let Some(source) = patch.source {
        record.source = clean_optional(Some(source)).unwrap_or_else(|| DEFAULT_SOURCE.to_string());
    }
    if let Some(email) = patch.email {
        record.email = clean_optional(email);
    }
    if let Some(observations) = patch.observations {
        record.observations = clean_optional(observations);
    }
    if let Some(product) = patch.product {
        record.product = clean_optional(product);
    }
    if let Some(value) = patch.property_value {
        record.property_value = value.as_ref().and_then(parse_property_value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::UserRepository, models::auth::Role, services::auth::EXTERNAL_CREDENTIAL_MARKER};
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::str::FromStr;

    fn valid_payload() -> CreateClientPayload {
        CreateClientPayload {
            name: Some("  Maria  ".into()),
            phone: Some("85999990000".into()),
            ..Default::default()
        }
    }

    #[test]
    fn create_applies_defaults() {
        let record = build_record(valid_payload()).unwrap();
        assert_eq!(record.name, "Maria");
        assert_eq!(record.source, "manual");
        assert_eq!(record.status, ClientStatus::InitialContact);
        assert_eq!(record.follow_up_state, FollowUpState::None);
        assert_eq!(record.property_value, None);
    }

    #[test]
    fn create_requires_name_and_phone() {
        let mut payload = valid_payload();
        payload.phone = Some("   ".into());
        assert!(matches!(build_record(payload), Err(AppError::Validation(_))));

        let mut payload = valid_payload();
        payload.name = None;
        assert!(matches!(build_record(payload), Err(AppError::Validation(_))));
    }

    #[test]
    fn create_rejects_unknown_status() {
        let mut payload = valid_payload();
        payload.status = Some("Won".into());
        assert!(matches!(build_record(payload), Err(AppError::Validation(_))));

        let mut payload = valid_payload();
        payload.follow_up_state = Some("Someday".into());
        assert!(matches!(build_record(payload), Err(AppError::Validation(_))));
    }

    #[test]
    fn bad_property_value_is_stored_as_null() {
        let mut payload = valid_payload();
        payload.property_value = Some(json!("muito caro"));
        assert_eq!(build_record(payload).unwrap().property_value, None);

        let mut payload = valid_payload();
        payload.property_value = Some(json!("350000,50"));
        assert_eq!(
            build_record(payload).unwrap().property_value,
            Some(Decimal::from_str("350000.50").unwrap())
        );
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut record = build_record(valid_payload()).unwrap();
        record.email = Some("maria@x.com".into());

        let patch: UpdateClientPayload =
            serde_json::from_value(json!({ "status": "Proposal", "observations": null })).unwrap();
        apply_patch(&mut record, patch).unwrap();

        assert_eq!(record.status, ClientStatus::Proposal);
        assert_eq!(record.observations, None);
        assert_eq!(record.email.as_deref(), Some("maria@x.com"));
        assert_eq!(record.name, "Maria");
    }

    #[test]
    fn invalid_patch_is_rejected_whole() {
        let mut record = build_record(valid_payload()).unwrap();
        let before = record.clone();

        let patch: UpdateClientPayload =
            serde_json::from_value(json!({ "name": "Outra", "followUpState": "Talvez" })).unwrap();
        assert!(apply_patch(&mut record, patch).is_err());
        // O service descarta o record; o nome nem chegou a ser aplicado
        assert_eq!(before.name, record.name);
    }

    #[test]
    fn filter_is_scoped_for_brokers() {
        let actor = Actor { user_id: Uuid::new_v4(), role: Role::Broker };
        let params = ClientSearchParams { q: Some("  ana ".into()), status: Some("In Progress".into()) };

        let filter = build_filter(&actor, &params).unwrap();
        assert_eq!(filter.owner_id, Some(actor.user_id));
        assert_eq!(filter.query.as_deref(), Some("ana"));
        assert_eq!(filter.status, Some(ClientStatus::InProgress));

        let params = ClientSearchParams { q: None, status: Some("Ganho".into()) };
        assert!(build_filter(&actor, &params).is_err());
    }

    // --- Testes com banco ---

    async fn user(pool: &PgPool, role: Role) -> Actor {
        let id = Uuid::new_v4();
        UserRepository::new(pool.clone())
            .insert_if_absent(pool, id, "Teste", &format!("{}@imob.com", id), EXTERNAL_CREDENTIAL_MARKER, role)
            .await
            .unwrap();
        Actor { user_id: id, role }
    }

    fn service(pool: &PgPool) -> ClientService {
        ClientService::new(
            ClientRepository::new(pool.clone()),
            InteractionRepository::new(pool.clone()),
            pool.clone(),
        )
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL (DATABASE_URL)"]
    async fn create_logs_client_created(pool: PgPool) {
        let broker = user(&pool, Role::Broker).await;
        let service = service(&pool);

        let client = service.create_client(&broker, valid_payload()).await.unwrap();
        let detail = service.get_client_detail(&broker, client.id).await.unwrap();

        assert_eq!(detail.client.owner_id, Some(broker.user_id));
        assert_eq!(detail.interactions.len(), 1);
        assert_eq!(detail.interactions[0].kind, CLIENT_CREATED);
        assert_eq!(detail.interactions[0].to_status.as_deref(), Some("Initial Contact"));
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL (DATABASE_URL)"]
    async fn brokers_are_isolated(pool: PgPool) {
        let broker_a = user(&pool, Role::Broker).await;
        let broker_b = user(&pool, Role::Broker).await;
        let manager = user(&pool, Role::Manager).await;
        let service = service(&pool);

        let client = service.create_client(&broker_a, valid_payload()).await.unwrap();

        let page_b = service
            .list_clients(&broker_b, &ClientSearchParams::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page_b.total, 0);

        let denied = service.get_client_detail(&broker_b, client.id).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        let page_manager = service
            .list_clients(&manager, &ClientSearchParams::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page_manager.total, 1);
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL (DATABASE_URL)"]
    async fn invalid_update_leaves_client_untouched(pool: PgPool) {
        let broker = user(&pool, Role::Broker).await;
        let service = service(&pool);
        let client = service.create_client(&broker, valid_payload()).await.unwrap();

        let patch: UpdateClientPayload = serde_json::from_value(json!({ "status": "Ganho" })).unwrap();
        assert!(service.update_client(&broker, client.id, patch).await.is_err());

        let after = service.get_client_detail(&broker, client.id).await.unwrap();
        assert_eq!(after.client.status, ClientStatus::InitialContact);
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL (DATABASE_URL)"]
    async fn delete_checks_existence_then_role(pool: PgPool) {
        let manager = user(&pool, Role::Manager).await;
        let admin = user(&pool, Role::Admin).await;
        let service = service(&pool);

        let missing = service.delete_client(&manager, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let client = service.create_client(&manager, valid_payload()).await.unwrap();
        let denied = service.delete_client(&manager, client.id).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        service.delete_client(&admin, client.id).await.unwrap();
        let gone = service.get_client_detail(&admin, client.id).await;
        assert!(matches!(gone, Err(AppError::NotFound(_))));
    }
}
