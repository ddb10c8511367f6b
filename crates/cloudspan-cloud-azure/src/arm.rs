//! Azure Resource Manager REST client
//!
//! Implements [`ComputeApi`] against `management.azure.com` with a bearer
//! token supplied by the caller. Token acquisition is not handled here.

use crate::compute::{ComputeApi, ImageCreateParams, ManagedImage, VmImage};
use crate::config::AzureConfig;
use crate::error::{AzureError, Result};
use async_trait::async_trait;
use cloudspan_cloud::{
    CloudError, ImageSource, LongRunningOperation, MarketplaceImageRef, OperationState,
};
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";

/// Resource Manager client scoped to one subscription and resource group
#[derive(Clone)]
pub struct ArmClient {
    client: reqwest::Client,
    endpoint: Url,
    subscription_id: String,
    resource_group: String,
    region: String,
    api_version: String,
    access_token: String,
}

impl ArmClient {
    pub fn new(config: &AzureConfig, access_token: impl Into<String>) -> Result<Self> {
        config.validate()?;
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| AzureError::InvalidConfig(format!("endpoint: {}", e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(AzureError::InvalidConfig(format!(
                "endpoint '{}' is not a base URL",
                config.endpoint
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            subscription_id: config.subscription_id.clone(),
            resource_group: config.resource_group.clone(),
            region: config.region.clone(),
            api_version: config.api_version.clone(),
            access_token: access_token.into(),
        })
    }

    /// Endpoint URL with the given path segments and the api-version query
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| AzureError::InvalidConfig("endpoint is not a base URL".into()))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    fn image_url(&self, name: Option<&str>) -> Result<Url> {
        let mut segments = vec![
            "subscriptions",
            self.subscription_id.as_str(),
            "resourceGroups",
            self.resource_group.as_str(),
            "providers",
            "Microsoft.Compute",
            "images",
        ];
        segments.extend(name);
        self.url(&segments)
    }

    /// `.../locations/{region}/publishers[/...]` for marketplace lookups
    fn publisher_url(&self, rest: &[&str]) -> Result<Url> {
        let mut segments = vec![
            "subscriptions",
            self.subscription_id.as_str(),
            "providers",
            "Microsoft.Compute",
            "locations",
            self.region.as_str(),
            "publishers",
        ];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    async fn get(&self, url: Url) -> Result<Response> {
        tracing::debug!("GET {}", url.path());
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        check_status(response).await
    }

    /// GET that maps 404 to `None`
    async fn get_optional<T>(&self, url: Url) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        match self.get(url).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(AzureError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Follow `nextLink` until the collection is exhausted
    async fn get_paged<T>(&self, url: Url) -> Result<Vec<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut items = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next.take() {
            let page: Page<T> = self.get(url).await?.json().await?;
            items.extend(page.value);
            if let Some(link) = page.next_link.filter(|l| !l.is_empty()) {
                next = Some(Url::parse(&link).map_err(|e| {
                    AzureError::UnexpectedResponse(format!("bad nextLink '{}': {}", link, e))
                })?);
            }
        }
        Ok(items)
    }

    /// Names from one of the marketplace listing endpoints
    async fn get_names(&self, url: Url) -> Result<Vec<String>> {
        let resources: Vec<NamedResource> = self.get(url).await?.json().await?;
        Ok(resources.into_iter().map(|r| r.name).collect())
    }

    fn operation(&self, description: String, headers: &HeaderMap) -> Result<ArmOperation> {
        ArmOperation::from_headers(
            self.client.clone(),
            self.access_token.clone(),
            description,
            headers,
        )
    }
}

#[async_trait]
impl ComputeApi for ArmClient {
    async fn get_image(&self, name: &str) -> Result<Option<ManagedImage>> {
        let image: Option<ArmImage> = self.get_optional(self.image_url(Some(name))?).await?;
        Ok(image.map(ManagedImage::from))
    }

    async fn list_images(&self) -> Result<Vec<ManagedImage>> {
        let images: Vec<ArmImage> = self.get_paged(self.image_url(None)?).await?;
        Ok(images.into_iter().map(ManagedImage::from).collect())
    }

    async fn begin_create_image(
        &self,
        name: &str,
        params: &ImageCreateParams,
    ) -> Result<Box<dyn LongRunningOperation>> {
        let url = self.image_url(Some(name))?;
        tracing::debug!("PUT {}", url.path());
        let response = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&ArmImageBody::from(params))
            .send()
            .await?;
        let response = check_status(response).await?;
        let operation = self.operation(format!("create image {}", name), response.headers());
        match operation {
            Ok(op) => Ok(Box::new(op)),
            // Synchronous completion: the body already carries the final state
            Err(_) => {
                let image: ArmImage = response.json().await?;
                Ok(Box::new(ProvisioningOperation::new(
                    format!("create image {}", name),
                    image.properties.and_then(|p| p.provisioning_state),
                )))
            }
        }
    }

    async fn begin_delete_image(&self, name: &str) -> Result<Box<dyn LongRunningOperation>> {
        let url = self.image_url(Some(name))?;
        tracing::debug!("DELETE {}", url.path());
        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let response = check_status(response).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Err(AzureError::NotFound(format!("image '{}'", name)));
        }
        let description = format!("delete image {}", name);
        match self.operation(description.clone(), response.headers()) {
            Ok(op) => Ok(Box::new(op)),
            Err(_) => Ok(Box::new(cloudspan_cloud::CompletedOperation::new(
                description,
            ))),
        }
    }

    async fn list_publishers(&self) -> Result<Vec<String>> {
        self.get_names(self.publisher_url(&[])?).await
    }

    async fn list_offers(&self, publisher: &str) -> Result<Vec<String>> {
        self.get_names(self.publisher_url(&[publisher, "artifacttypes", "vmimage", "offers"])?)
            .await
    }

    async fn list_skus(&self, publisher: &str, offer: &str) -> Result<Vec<String>> {
        self.get_names(self.publisher_url(&[
            publisher,
            "artifacttypes",
            "vmimage",
            "offers",
            offer,
            "skus",
        ])?)
        .await
    }

    async fn list_image_versions(
        &self,
        publisher: &str,
        offer: &str,
        sku: &str,
    ) -> Result<Vec<String>> {
        self.get_names(self.publisher_url(&[
            publisher,
            "artifacttypes",
            "vmimage",
            "offers",
            offer,
            "skus",
            sku,
            "versions",
        ])?)
        .await
    }

    async fn get_vm_image(&self, image: &MarketplaceImageRef) -> Result<VmImage> {
        let version = image.version.as_deref().ok_or_else(|| {
            AzureError::CloudError(CloudError::Validation(format!(
                "marketplace image '{}' has no version",
                image
            )))
        })?;
        let url = self.publisher_url(&[
            image.publisher.as_str(),
            "artifacttypes",
            "vmimage",
            "offers",
            image.offer.as_str(),
            "skus",
            image.sku.as_str(),
            "versions",
            version,
        ])?;
        let found: Option<ArmVmImage> = self.get_optional(url).await?;
        found
            .map(VmImage::from)
            .ok_or_else(|| AzureError::NotFound(format!("marketplace image '{}'", image)))
    }
}

/// Turn a non-success response into [`AzureError::Api`]
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status.as_u16(), &body))
}

fn api_error(status: u16, body: &str) -> AzureError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => AzureError::Api {
            status,
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => AzureError::Api {
            status,
            code: status.to_string(),
            message: if body.is_empty() {
                "empty response body".to_string()
            } else {
                body.to_string()
            },
        },
    }
}

/// Where an accepted operation reports its progress
#[derive(Debug, Clone, PartialEq, Eq)]
enum PollTarget {
    /// `Azure-AsyncOperation`: a status document
    AsyncOperation(Url),
    /// `Location`: 202 until done
    Location(Url),
}

/// Operation accepted by Resource Manager and tracked through its headers
pub struct ArmOperation {
    client: reqwest::Client,
    access_token: String,
    description: String,
    target: PollTarget,
}

impl ArmOperation {
    fn from_headers(
        client: reqwest::Client,
        access_token: String,
        description: String,
        headers: &HeaderMap,
    ) -> Result<Self> {
        let header_url = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| Url::parse(v).ok())
        };
        let target = if let Some(url) = header_url(ASYNC_OPERATION_HEADER) {
            PollTarget::AsyncOperation(url)
        } else if let Some(url) = header_url(LOCATION.as_str()) {
            PollTarget::Location(url)
        } else {
            return Err(AzureError::UnexpectedResponse(format!(
                "no polling header for '{}'",
                description
            )));
        };
        Ok(Self {
            client,
            access_token,
            description,
            target,
        })
    }

    async fn poll_target(&self) -> Result<OperationState> {
        match &self.target {
            PollTarget::AsyncOperation(url) => {
                let response = self
                    .client
                    .get(url.clone())
                    .bearer_auth(&self.access_token)
                    .send()
                    .await?;
                let status: AsyncOperationStatus = check_status(response).await?.json().await?;
                Ok(status.into_state())
            }
            PollTarget::Location(url) => {
                let response = self
                    .client
                    .get(url.clone())
                    .bearer_auth(&self.access_token)
                    .send()
                    .await?;
                if response.status() == StatusCode::ACCEPTED {
                    return Ok(OperationState::InProgress);
                }
                match check_status(response).await {
                    Ok(_) => Ok(OperationState::Succeeded),
                    Err(AzureError::Api { code, message, .. }) => {
                        Ok(OperationState::Failed(format!("{}: {}", code, message)))
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }
}

#[async_trait]
impl LongRunningOperation for ArmOperation {
    fn describe(&self) -> &str {
        &self.description
    }

    async fn poll(&mut self) -> cloudspan_cloud::Result<OperationState> {
        self.poll_target().await.map_err(CloudError::from)
    }
}

/// Operation whose outcome was in the initial response
struct ProvisioningOperation {
    description: String,
    state: OperationState,
}

impl ProvisioningOperation {
    fn new(description: String, provisioning_state: Option<String>) -> Self {
        let state = match provisioning_state.as_deref() {
            Some("Failed") => OperationState::Failed("provisioning failed".to_string()),
            Some("Canceled") => OperationState::Canceled,
            Some("Succeeded") | None => OperationState::Succeeded,
            Some(_) => OperationState::InProgress,
        };
        Self { description, state }
    }
}

#[async_trait]
impl LongRunningOperation for ProvisioningOperation {
    fn describe(&self) -> &str {
        &self.description
    }

    async fn poll(&mut self) -> cloudspan_cloud::Result<OperationState> {
        // In-progress without a polling header never settles; report it as such
        Ok(self.state.clone())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct AsyncOperationStatus {
    status: String,
    #[serde(default)]
    error: Option<ErrorBody>,
}

impl AsyncOperationStatus {
    fn into_state(self) -> OperationState {
        match self.status.as_str() {
            "Succeeded" => OperationState::Succeeded,
            "Canceled" => OperationState::Canceled,
            "Failed" => {
                let error = self.error.unwrap_or_default();
                OperationState::Failed(format!("{}: {}", error.code, error.message))
            }
            _ => OperationState::InProgress,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ArmImage {
    id: Option<String>,
    name: String,
    location: String,
    properties: Option<ArmImageProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmImageProperties {
    storage_profile: Option<ArmStorageProfile>,
    provisioning_state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmStorageProfile {
    os_disk: Option<ArmOsDisk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmOsDisk {
    os_type: Option<String>,
}

impl From<ArmImage> for ManagedImage {
    fn from(image: ArmImage) -> Self {
        let (os_type, provisioning_state) = match image.properties {
            Some(p) => (
                p.storage_profile
                    .and_then(|s| s.os_disk)
                    .and_then(|d| d.os_type),
                p.provisioning_state,
            ),
            None => (None, None),
        };
        Self {
            id: image.id,
            name: image.name,
            location: image.location,
            os_type,
            provisioning_state,
        }
    }
}

#[derive(Debug, Serialize)]
struct ArmImageBody {
    location: String,
    properties: ArmImageBodyProperties,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ArmImageBodyProperties {
    storage_profile: ArmImageBodyStorage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ArmImageBodyStorage {
    os_disk: ArmImageBodyOsDisk,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ArmImageBodyOsDisk {
    os_type: &'static str,
    os_state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    managed_disk: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    blob_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubResource {
    id: String,
}

impl From<&ImageCreateParams> for ArmImageBody {
    fn from(params: &ImageCreateParams) -> Self {
        let (managed_disk, blob_uri) = match &params.source {
            ImageSource::ManagedDisk(id) => (Some(SubResource { id: id.clone() }), None),
            ImageSource::BlobUri(uri) => (None, Some(uri.clone())),
        };
        Self {
            location: params.location.clone(),
            properties: ArmImageBodyProperties {
                storage_profile: ArmImageBodyStorage {
                    os_disk: ArmImageBodyOsDisk {
                        os_type: params.os_type.as_str(),
                        os_state: "Generalized",
                        managed_disk,
                        blob_uri,
                    },
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArmVmImage {
    id: String,
    name: String,
    location: String,
    properties: Option<ArmVmImageProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmVmImageProperties {
    os_disk_image: Option<ArmOsDiskImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmOsDiskImage {
    operating_system: Option<String>,
}

impl From<ArmVmImage> for VmImage {
    fn from(image: ArmVmImage) -> Self {
        Self {
            id: image.id,
            name: image.name,
            location: image.location,
            operating_system: image
                .properties
                .and_then(|p| p.os_disk_image)
                .and_then(|d| d.operating_system),
        }
    }
}
